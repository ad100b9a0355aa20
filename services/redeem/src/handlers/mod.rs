pub mod health;
pub mod redeem;
