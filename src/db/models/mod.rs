#![allow(unused_imports)]

//! Database models, one file per table family.
//! Everything is re-exported at `crate::db::models` so callers can
//! `use crate::db::models::*;`.

pub mod adherence;
pub mod appointment;
pub mod device_token;
pub mod happy_memory;
pub mod journey;
pub mod mood_entry;
pub mod notification_queue;
pub mod password_reset;
pub mod psychologist;
pub mod user;
pub mod user_settings;

pub use self::adherence::*;
pub use self::appointment::*;
pub use self::device_token::*;
pub use self::happy_memory::*;
pub use self::journey::*;
pub use self::mood_entry::*;
pub use self::notification_queue::*;
pub use self::password_reset::*;
pub use self::psychologist::*;
pub use self::user::*;
pub use self::user_settings::*;
