pub mod hit;
pub mod paint;

pub use hit::{hit_card, hit_connection_point, hit_header, hit_line, marquee_hits};
pub use paint::{Overlay, paint_board};
