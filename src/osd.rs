//! On-screen time display text.

use std::time::Duration;

/// What the on-screen display shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShowType {
    None,
    CurrentTime,
    #[default]
    CurrentAndTotalTime,
    RemainTime,
    Percent,
}

impl ShowType {
    /// The mode after this one; wraps around through `None`.
    pub fn next(self) -> Self {
        match self {
            ShowType::None => ShowType::CurrentTime,
            ShowType::CurrentTime => ShowType::CurrentAndTotalTime,
            ShowType::CurrentAndTotalTime => ShowType::RemainTime,
            ShowType::RemainTime => ShowType::Percent,
            ShowType::Percent => ShowType::None,
        }
    }
}

/// Playback position as reported by the frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatistics {
    pub current_time: Duration,
    /// `None` while the total duration is unknown, e.g. for live streams.
    pub duration: Option<Duration>,
}

/// Formats playback statistics according to the selected [`ShowType`].
#[derive(Debug, Clone, Default)]
pub struct Osd {
    show_type: ShowType,
}

impl Osd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_type(&self) -> ShowType {
        self.show_type
    }

    pub fn set_show_type(&mut self, show_type: ShowType) {
        self.show_type = show_type;
    }

    pub fn use_next_show_type(&mut self) {
        self.show_type = self.show_type.next();
    }

    pub fn text(&self, statistics: &PlaybackStatistics) -> String {
        let current = statistics.current_time;
        let mut text = String::new();

        match self.show_type {
            ShowType::None => {}
            ShowType::CurrentTime => text.push_str(&hms(current)),
            ShowType::CurrentAndTotalTime => {
                text.push_str(&hms(current));
                if let Some(total) = statistics.duration {
                    text.push('/');
                    text.push_str(&hms(total));
                }
            }
            ShowType::RemainTime => {
                if let Some(total) = statistics.duration {
                    text.push('-');
                    text.push_str(&hms(total.saturating_sub(current)));
                }
            }
            ShowType::Percent => {
                let total = statistics.duration.map(|d| d.as_secs()).unwrap_or(0);
                if total > 0 {
                    let percent = current.as_secs() as f64 / total as f64 * 100.0;
                    text.push_str(&format!("{percent:.1}%"));
                }
            }
        }
        text
    }
}

/// `HH:MM:SS`, whole seconds.
fn hms(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(current: u64, total: Option<u64>) -> PlaybackStatistics {
        PlaybackStatistics {
            current_time: Duration::from_millis(current * 1000 + 400),
            duration: total.map(Duration::from_secs),
        }
    }

    #[test]
    fn cycles_through_every_mode() {
        let mut osd = Osd::new();
        assert_eq!(osd.show_type(), ShowType::CurrentAndTotalTime);
        let mut seen = vec![osd.show_type()];
        for _ in 0..5 {
            osd.use_next_show_type();
            seen.push(osd.show_type());
        }
        assert_eq!(
            seen,
            [
                ShowType::CurrentAndTotalTime,
                ShowType::RemainTime,
                ShowType::Percent,
                ShowType::None,
                ShowType::CurrentTime,
                ShowType::CurrentAndTotalTime,
            ]
        );
    }

    #[test]
    fn formats_each_mode() {
        let mut osd = Osd::new();
        let s = stats(3725, Some(7200));

        assert_eq!(osd.text(&s), "01:02:05/02:00:00");
        osd.set_show_type(ShowType::CurrentTime);
        assert_eq!(osd.text(&s), "01:02:05");
        osd.set_show_type(ShowType::RemainTime);
        assert_eq!(osd.text(&s), "-00:57:54");
        osd.set_show_type(ShowType::Percent);
        assert_eq!(osd.text(&s), "51.7%");
        osd.set_show_type(ShowType::None);
        assert_eq!(osd.text(&s), "");
    }

    #[test]
    fn unknown_duration_stops_after_current_time() {
        let mut osd = Osd::new();
        let s = stats(59, None);
        assert_eq!(osd.text(&s), "00:00:59");
        osd.set_show_type(ShowType::Percent);
        assert_eq!(osd.text(&s), "");
        osd.set_show_type(ShowType::RemainTime);
        assert_eq!(osd.text(&s), "");
    }
}
