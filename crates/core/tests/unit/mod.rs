pub mod scenario_a_data_processing_carry;
pub mod scenario_b_banked_sp;
pub mod scenario_c_thumb_blx;
pub mod scenario_d_block_cache_invalidation;
pub mod scenario_e_constant_propagation;
pub mod scenario_f_idle_loop;
pub mod scenario_g_reset_bus_interaction;
pub mod universal_properties;
