pub(crate) mod analyze;
pub(crate) mod generate;
pub(crate) mod run;
pub(crate) mod validate;
