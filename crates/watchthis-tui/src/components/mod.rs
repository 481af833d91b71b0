pub mod details_pane;
pub mod movie_list;
pub mod search_overlay;
