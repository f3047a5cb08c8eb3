use image::Rgb;

use crate::domain::layer::Color;

/// Dark chart furniture. Series colors come from the layers themselves.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Rgb<u8>,
    pub panel: Rgb<u8>,
    pub grid: Rgb<u8>,
    pub axis: Rgb<u8>,
    pub text: Rgb<u8>,
    pub muted_text: Rgb<u8>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgb([10, 10, 35]),
            panel: Rgb([14, 14, 42]),
            grid: Rgb([38, 38, 70]),
            axis: Rgb([90, 90, 120]),
            text: Rgb([220, 220, 230]),
            muted_text: Rgb([150, 150, 170]),
        }
    }
}

pub fn to_rgb(color: Color) -> Rgb<u8> {
    Rgb([color.r, color.g, color.b])
}
