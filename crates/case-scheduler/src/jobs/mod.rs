pub mod deadline;
pub mod followup;
pub mod portal_stuck;
pub mod retention;
pub mod stale_run;
