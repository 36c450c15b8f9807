pub mod email;

pub use email::EmailReporter;
