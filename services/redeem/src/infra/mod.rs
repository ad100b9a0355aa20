pub mod alert;
pub mod db;
pub mod issuer;
pub mod jwt;
pub mod mailer;
