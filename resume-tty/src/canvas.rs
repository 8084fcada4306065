use resume_core::{PageRect, RenderImage};

pub const BACKGROUND: [u8; 4] = [24, 24, 27, 255];

/// A page bitmap and where it sits in content coordinates.
pub struct PlacedPage<'a> {
    pub rect: PageRect,
    pub image: &'a RenderImage,
}

/// Paints the slice of the page stack between `scroll_top` and
/// `scroll_top + height` onto a `width` x `height` RGBA canvas.
///
/// Pages are centred horizontally; a page wider than the canvas is cropped
/// evenly on both sides.
pub fn compose_viewport(
    width: u32,
    height: u32,
    scroll_top: f32,
    pages: &[PlacedPage<'_>],
) -> RenderImage {
    let width = width.max(1);
    let height = height.max(1);
    let stride = width as usize * 4;
    let mut pixels = BACKGROUND.repeat(width as usize * height as usize);

    for placed in pages {
        let image = placed.image;
        if image.width == 0 || image.height == 0 {
            continue;
        }

        let (dest_x, src_x, copy_width) = horizontal_span(width, image.width);
        let page_top = (placed.rect.top - scroll_top).round() as i64;
        let src_stride = image.width as usize * 4;

        for src_y in 0..image.height {
            let dest_y = page_top + i64::from(src_y);
            if dest_y < 0 {
                continue;
            }
            if dest_y >= i64::from(height) {
                break;
            }

            let src_start = src_y as usize * src_stride + src_x as usize * 4;
            let src_end = src_start + copy_width as usize * 4;
            let dest_start = dest_y as usize * stride + dest_x as usize * 4;
            let dest_end = dest_start + copy_width as usize * 4;
            if src_end > image.pixels.len() {
                break;
            }
            pixels[dest_start..dest_end].copy_from_slice(&image.pixels[src_start..src_end]);
        }
    }

    RenderImage {
        width,
        height,
        pixels,
    }
}

/// Returns `(dest_x, src_x, copy_width)` for centring `image_width` on a
/// canvas of `canvas_width`.
fn horizontal_span(canvas_width: u32, image_width: u32) -> (u32, u32, u32) {
    if image_width <= canvas_width {
        ((canvas_width - image_width) / 2, 0, image_width)
    } else {
        (0, (image_width - canvas_width) / 2, canvas_width)
    }
}
