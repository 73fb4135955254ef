use smallvec::SmallVec;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle. `x`/`y` may be negative when the output overflows
/// the drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the last column.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// One past the last row.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Rect::default();
        }
        Rect::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }
}

/// How the frame is placed inside the drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFit {
    /// Largest aspect-correct rectangle inside the drawable, centered.
    #[default]
    Contain,
    /// Smallest aspect-correct rectangle covering the drawable, centered.
    Cover,
    /// Stretch to the whole drawable.
    Fill,
    /// Like `Contain`, but never larger than the source.
    ScaleDown,
    /// Source size, centered.
    None,
}

/// Destination rectangle for a `source`-sized frame in a `drawable`-sized
/// window.
pub fn output_rect(source: Size, drawable: Size, fit: ContentFit) -> Rect {
    let full = Rect::from_size(drawable);
    if source.is_empty() || drawable.is_empty() {
        return full;
    }

    // aspect comparisons in integers: source.w / source.h vs drawable.w / drawable.h
    let drawable_wider = drawable.width as u64 * source.height as u64
        >= source.width as u64 * drawable.height as u64;

    match fit {
        ContentFit::Fill => full,
        ContentFit::Contain => contain(source, drawable, drawable_wider),
        ContentFit::ScaleDown => {
            if source.width <= drawable.width && source.height <= drawable.height {
                centered(source, drawable)
            } else {
                contain(source, drawable, drawable_wider)
            }
        }
        ContentFit::Cover => {
            let size = if drawable_wider {
                Size::new(drawable.width, scale(drawable.width, source.height, source.width))
            } else {
                Size::new(scale(drawable.height, source.width, source.height), drawable.height)
            };
            centered(size, drawable)
        }
        ContentFit::None => centered(source, drawable),
    }
}

/// `value * num / den`, truncated.
fn scale(value: u32, num: u32, den: u32) -> u32 {
    (value as u64 * num as u64 / den as u64) as u32
}

fn contain(source: Size, drawable: Size, drawable_wider: bool) -> Rect {
    if drawable_wider {
        // keep the drawable height, pillarbox
        let width = scale(drawable.height, source.width, source.height);
        Rect::new(
            (drawable.width - width) as i32 / 2,
            0,
            width,
            drawable.height,
        )
    } else {
        // keep the drawable width, letterbox
        let height = scale(drawable.width, source.height, source.width);
        Rect::new(
            0,
            (drawable.height - height) as i32 / 2,
            drawable.width,
            height,
        )
    }
}

fn centered(size: Size, drawable: Size) -> Rect {
    Rect::new(
        (drawable.width as i32 - size.width as i32) / 2,
        (drawable.height as i32 - size.height as i32) / 2,
        size.width,
        size.height,
    )
}

/// Regions of `drawable` left uncovered by `out`: left/right bars when the
/// output is narrower, top/bottom bars when it is shorter.
pub fn margins(out: Rect, drawable: Size) -> SmallVec<[Rect; 4]> {
    let mut bars = SmallVec::new();
    let out = out.intersect(&Rect::from_size(drawable));
    if out.is_empty() {
        if !drawable.is_empty() {
            bars.push(Rect::from_size(drawable));
        }
        return bars;
    }

    let (w, h) = (drawable.width as i32, drawable.height as i32);
    if out.width < drawable.width {
        bars.push(Rect::new(0, 0, out.x as u32, drawable.height));
        bars.push(Rect::new(out.right(), 0, (w - out.right()) as u32, drawable.height));
    }
    if out.height < drawable.height {
        bars.push(Rect::new(0, 0, drawable.width, out.y as u32));
        bars.push(Rect::new(0, out.bottom(), drawable.width, (h - out.bottom()) as u32));
    }
    bars.retain(|bar| !bar.is_empty());
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contain_pillarboxes_wide_drawable() {
        let out = output_rect(Size::new(4, 3), Size::new(800, 300), ContentFit::Contain);
        assert_eq!(out, Rect::new(200, 0, 400, 300));
    }

    #[test]
    fn contain_letterboxes_tall_drawable() {
        let out = output_rect(Size::new(16, 9), Size::new(320, 400), ContentFit::Contain);
        assert_eq!(out, Rect::new(0, 110, 320, 180));
    }

    #[test]
    fn matching_aspect_covers_drawable() {
        let out = output_rect(Size::new(4, 2), Size::new(200, 100), ContentFit::Contain);
        assert_eq!(out, Rect::new(0, 0, 200, 100));
        assert!(margins(out, Size::new(200, 100)).is_empty());
    }

    #[test]
    fn cover_overflows_drawable() {
        let out = output_rect(Size::new(4, 3), Size::new(800, 300), ContentFit::Cover);
        assert_eq!(out, Rect::new(0, -150, 800, 600));
        assert!(margins(out, Size::new(800, 300)).is_empty());
    }

    #[test]
    fn scale_down_keeps_small_sources() {
        let out = output_rect(Size::new(100, 50), Size::new(300, 150), ContentFit::ScaleDown);
        assert_eq!(out, Rect::new(100, 50, 100, 50));
        let out = output_rect(Size::new(600, 300), Size::new(300, 300), ContentFit::ScaleDown);
        assert_eq!(out, Rect::new(0, 75, 300, 150));
    }

    #[test]
    fn empty_source_fills_drawable() {
        let out = output_rect(Size::default(), Size::new(10, 10), ContentFit::Contain);
        assert_eq!(out, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn pillarbox_margins() {
        let bars = margins(Rect::new(200, 0, 400, 300), Size::new(801, 300));
        assert_eq!(
            bars.as_slice(),
            &[Rect::new(0, 0, 200, 300), Rect::new(600, 0, 201, 300)]
        );
    }

    #[test]
    fn letterbox_margins() {
        let bars = margins(Rect::new(0, 110, 320, 180), Size::new(320, 400));
        assert_eq!(
            bars.as_slice(),
            &[Rect::new(0, 0, 320, 110), Rect::new(0, 290, 320, 110)]
        );
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(10, 10, 2, 2);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(a.intersect(&Rect::new(2, 2, 4, 4)), Rect::new(2, 2, 2, 2));
    }
}
