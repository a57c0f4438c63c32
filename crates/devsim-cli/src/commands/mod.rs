pub mod list_dynamics;
pub mod run;
pub mod validate;
