use crate::display::{AttributeDescriptor, DisplayConnection};
use std::sync::Arc;

/// Visual adjustments exposed by overlay ports under fixed names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Brightness,
    Contrast,
    Hue,
    Saturation,
}

impl Attribute {
    pub const fn name(&self) -> &'static str {
        match self {
            Attribute::Brightness => "XV_BRIGHTNESS",
            Attribute::Contrast => "XV_CONTRAST",
            Attribute::Hue => "XV_HUE",
            Attribute::Saturation => "XV_SATURATION",
        }
    }
}

/// Map `value` in `[-100, 100]` linearly onto the device range.
///
/// Integer arithmetic, truncating, on the magnitudes of the bounds. Widened to
/// `i64` so full 32-bit ranges (e.g. a 24-bit colour key) cannot overflow; the
/// result is clamped into the range.
pub fn scale_normalized(value: i32, min: i32, max: i32) -> i32 {
    let low = i64::from(min.unsigned_abs());
    let span = low + i64::from(max.unsigned_abs());
    let scaled = (i64::from(value) + 100) * span / 200 - low;
    let (lo, hi) = (min.min(max), min.max(max));
    scaled.clamp(i64::from(lo), i64::from(hi)) as i32
}

/// First descriptor called `name` that can be written.
pub fn find_settable<'a>(
    descriptors: &'a [AttributeDescriptor],
    name: &str,
) -> Option<&'a AttributeDescriptor> {
    descriptors
        .iter()
        .find(|attribute| attribute.settable && attribute.name == name)
}

/// Best-effort writer of normalized visual adjustments.
#[derive(Clone)]
pub struct SurfaceAttributeController {
    display: Arc<dyn DisplayConnection>,
}

impl SurfaceAttributeController {
    pub fn new(display: Arc<dyn DisplayConnection>) -> Self {
        Self { display }
    }

    /// Rescale `value` (`[-100, 100]`) into the device range of `name` and
    /// apply it. Returns `false` when the device cannot be asked or has no
    /// writable attribute of that name.
    pub fn set_normalized_attribute(&self, name: &str, value: i32) -> bool {
        let value = value.clamp(-100, 100);
        let descriptors = match self.display.query_attributes() {
            Ok(descriptors) => descriptors,
            Err(err) => {
                log::warn!("failed to query overlay attributes: {err}");
                return false;
            }
        };

        let Some(attribute) = find_settable(&descriptors, name) else {
            log::warn!("can not set overlay attribute '{name}'");
            return false;
        };

        let scaled = scale_normalized(value, attribute.min, attribute.max);
        if let Err(err) = self.display.set_attribute(name, scaled) {
            log::warn!("failed to set overlay attribute '{name}' to {scaled}: {err}");
            return false;
        }
        log::trace!("{name} = {scaled} (normalized {value})");
        true
    }

    pub fn set(&self, attribute: Attribute, value: i32) -> bool {
        self.set_normalized_attribute(attribute.name(), value)
    }
}

impl std::fmt::Debug for SurfaceAttributeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceAttributeController").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::software::SoftwareDisplay;

    #[test]
    fn scales_into_symmetric_range() {
        assert_eq!(scale_normalized(100, -50, 50), 50);
        assert_eq!(scale_normalized(-100, -50, 50), -50);
        assert_eq!(scale_normalized(0, -50, 50), 0);
    }

    #[test]
    fn scales_into_positive_range() {
        assert_eq!(scale_normalized(-100, 0, 255), 0);
        assert_eq!(scale_normalized(100, 0, 255), 255);
        // 100 * 255 / 200 truncates
        assert_eq!(scale_normalized(0, 0, 255), 127);
    }

    #[test]
    fn scales_full_width_ranges() {
        assert_eq!(scale_normalized(100, 0, 0xFFFFFF), 0xFFFFFF);
        assert_eq!(scale_normalized(0, 0, 0xFFFFFF), 0x7FFFFF);
        assert_eq!(scale_normalized(-100, 0, 0xFFFFFF), 0);
        assert_eq!(scale_normalized(100, i32::MIN, i32::MAX), i32::MAX);
        assert_eq!(scale_normalized(-100, i32::MIN, i32::MAX), i32::MIN);
    }

    #[test]
    fn result_stays_inside_range() {
        // |min| shifts the low end below a positive minimum
        assert_eq!(scale_normalized(-100, 10, 100), 10);
        assert_eq!(scale_normalized(100, 10, 100), 100);
    }

    #[test]
    fn colour_key_range_is_written() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(8, 8)));
        display.set_attributes(vec![AttributeDescriptor::settable("XV_COLORKEY", 0, 0xFFFFFF)]);
        let controller = SurfaceAttributeController::new(display.clone());

        assert!(controller.set_normalized_attribute("XV_COLORKEY", 100));
        assert_eq!(
            display.attribute_writes(),
            vec![("XV_COLORKEY".to_string(), 0xFFFFFF)]
        );
    }

    #[test]
    fn find_skips_read_only() {
        let mut read_only = AttributeDescriptor::settable("XV_HUE", -180, 180);
        read_only.settable = false;
        let descriptors = vec![
            read_only,
            AttributeDescriptor::settable("XV_BRIGHTNESS", -1000, 1000),
        ];

        assert!(find_settable(&descriptors, "XV_HUE").is_none());
        assert_eq!(
            find_settable(&descriptors, "XV_BRIGHTNESS").map(|a| a.max),
            Some(1000)
        );
        assert!(find_settable(&descriptors, "XV_GAMMA").is_none());
    }

    #[test]
    fn applies_scaled_value() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(8, 8)));
        display.set_attributes(vec![AttributeDescriptor::settable("XV_CONTRAST", -50, 50)]);
        let controller = SurfaceAttributeController::new(display.clone());

        assert!(controller.set(Attribute::Contrast, 100));
        assert!(controller.set_normalized_attribute("XV_CONTRAST", -100));
        assert_eq!(
            display.attribute_writes(),
            vec![("XV_CONTRAST".to_string(), 50), ("XV_CONTRAST".to_string(), -50)]
        );
    }

    #[test]
    fn missing_attribute_is_not_written() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(8, 8)));
        display.set_attributes(vec![AttributeDescriptor::settable("XV_CONTRAST", -50, 50)]);
        let controller = SurfaceAttributeController::new(display.clone());

        assert!(!controller.set_normalized_attribute("XV_SHARPNESS", 10));
        assert!(display.attribute_writes().is_empty());
    }

    #[test]
    fn failed_query_reports_false() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(8, 8)));
        display.disable_attribute_queries();
        let controller = SurfaceAttributeController::new(display.clone());

        assert!(!controller.set(Attribute::Brightness, 0));
        assert!(display.attribute_writes().is_empty());
    }
}
