pub mod completion;
pub mod login;
