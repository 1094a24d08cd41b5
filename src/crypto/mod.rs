pub mod hash;
pub mod identity;
pub mod sign;
