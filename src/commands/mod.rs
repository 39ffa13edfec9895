pub mod evaluate;
pub mod simulate;
