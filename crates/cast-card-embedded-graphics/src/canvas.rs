use cast_card_render::CardError;
use core::convert::Infallible;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};

/// Draw target that can composite a color over what is already drawn.
pub trait BlendTarget: DrawTarget<Color = Rgb888> {
    /// Blend `color` at `alpha` (0 transparent, 255 opaque) over `point`.
    /// Points outside the target are ignored.
    fn blend_pixel(&mut self, point: Point, color: Rgb888, alpha: u8);
}

/// Owned RGBA8 surface for one render call.
///
/// Every pixel stays opaque; translucent draws go through
/// [`BlendTarget::blend_pixel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Opaque black canvas.
    pub fn new(width: u32, height: u32) -> Result<Self, CardError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| {
                CardError::InvalidLayout(format!("canvas {}x{} is too large", width, height))
            })?;
        let mut pixels = vec![0u8; len];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 0xFF;
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 rows, top to bottom.
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)`, if inside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(Point::new(x as i32, y as i32))?;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }

    /// Consume the canvas into PNG bytes.
    pub fn into_png(self) -> Result<Vec<u8>, CardError> {
        let mut out = Vec::with_capacity(self.pixels.len() / 8);
        PngEncoder::new(&mut out)
            .write_image(
                &self.pixels,
                self.width,
                self.height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|err| CardError::EncodingFailure(err.to_string()))?;
        Ok(out)
    }

    fn index(&self, point: Point) -> Option<usize> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    fn put(&mut self, point: Point, color: Rgb888) {
        if let Some(idx) = self.index(point) {
            self.pixels[idx] = color.r();
            self.pixels[idx + 1] = color.g();
            self.pixels[idx + 2] = color.b();
        }
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = color.r();
            px[1] = color.g();
            px[2] = color.b();
            px[3] = 0xFF;
        }
        Ok(())
    }
}

impl BlendTarget for Canvas {
    fn blend_pixel(&mut self, point: Point, color: Rgb888, alpha: u8) {
        let Some(idx) = self.index(point) else {
            return;
        };
        let a = u16::from(alpha);
        for (channel, src) in [color.r(), color.g(), color.b()].into_iter().enumerate() {
            let dst = u16::from(self.pixels[idx + channel]);
            let mixed = (u16::from(src) * a + dst * (255 - a) + 127) / 255;
            self.pixels[idx + channel] = mixed as u8;
        }
    }
}

/// Adapter that blends everything drawn through it at a fixed alpha.
pub(crate) struct Translucent<'a, D> {
    target: &'a mut D,
    alpha: u8,
}

impl<'a, D> Translucent<'a, D>
where
    D: BlendTarget,
{
    pub(crate) fn new(target: &'a mut D, alpha: u8) -> Self {
        Self { target, alpha }
    }
}

impl<D> Dimensions for Translucent<'_, D>
where
    D: BlendTarget,
{
    fn bounding_box(&self) -> Rectangle {
        self.target.bounding_box()
    }
}

impl<D> DrawTarget for Translucent<'_, D>
where
    D: BlendTarget,
{
    type Color = Rgb888;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.target.blend_pixel(point, color, self.alpha);
        }
        Ok(())
    }
}

/// Adapter that draws each pixel as a `scale`×`scale` block at
/// `origin + point * scale`.
pub(crate) struct Scaled<'a, D> {
    target: &'a mut D,
    origin: Point,
    scale: u32,
}

impl<'a, D> Scaled<'a, D>
where
    D: DrawTarget<Color = Rgb888>,
{
    pub(crate) fn new(target: &'a mut D, origin: Point, scale: u32) -> Self {
        Self {
            target,
            origin,
            scale: scale.max(1),
        }
    }
}

impl<D> Dimensions for Scaled<'_, D>
where
    D: DrawTarget<Color = Rgb888>,
{
    fn bounding_box(&self) -> Rectangle {
        let outer = self.target.bounding_box();
        let s = self.scale as i32;
        let offset = outer.top_left - self.origin;
        Rectangle::new(
            Point::new(offset.x.div_euclid(s), offset.y.div_euclid(s)),
            Size::new(
                outer.size.width / self.scale + 1,
                outer.size.height / self.scale + 1,
            ),
        )
    }
}

impl<D> DrawTarget for Scaled<'_, D>
where
    D: DrawTarget<Color = Rgb888>,
{
    type Color = Rgb888;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let s = self.scale as i32;
        let block = Size::new_equal(self.scale);
        for Pixel(point, color) in pixels {
            let top_left = self.origin + Point::new(point.x * s, point.y * s);
            self.target
                .fill_solid(&Rectangle::new(top_left, block), color)?;
        }
        Ok(())
    }
}
