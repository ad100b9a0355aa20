pub mod allocate;
pub mod eligibility;
pub mod notice;
pub mod redeem;
pub mod replenish;
