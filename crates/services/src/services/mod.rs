pub mod opportunity_board;
pub mod opportunity_planner;
pub mod pointer_interaction;
pub mod scorecard;
pub mod scorecard_highlights;
pub mod timeline_layout;
