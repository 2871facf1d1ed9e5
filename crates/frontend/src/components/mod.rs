pub mod detail_panel;
pub mod editor_bar;
pub mod layer_control;
pub mod map_view;
pub mod rename_dialog;
