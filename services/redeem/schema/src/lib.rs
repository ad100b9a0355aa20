pub mod redeem_codes;
