pub mod auth;
pub mod checkin;
pub mod init;
pub mod journey;
pub mod mailer;
pub mod notifications;
pub mod push;
pub mod scoring;
pub mod support;
