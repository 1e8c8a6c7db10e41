#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

#[macro_use]
pub mod utils;

#[path = "bn/openssl.rs"]
pub mod bn;

pub mod cl;
pub mod errors;
pub mod groups;
pub mod zkp;
