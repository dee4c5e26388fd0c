pub mod transient;
