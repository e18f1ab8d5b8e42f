/*
 * ============================================================================
 * SHOWCASE MODULE
 * ============================================================================
 *
 * The demo-facing half of the bridge: the rotating glasses turntable, the
 * communication modes and their simulated speech engine, and the canned
 * progress dashboard. The capture pipeline films the turntable; everything
 * else exists so a host UI has something coherent to present around it.
 *
 * ============================================================================
 */

pub mod dashboard;
pub mod interface;
pub mod modes;
pub mod speech;
pub mod turntable;
