pub mod carriers;
pub mod cold_room_pallets;
pub mod loading_line_items;
pub mod loading_sheets;
