//! Trackers for the AY-3-8910/YM2149 sound chip

pub mod protracker2;
pub mod soundtrackerpro;
