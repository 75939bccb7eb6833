use chrono::{DateTime, Duration, Utc};

/// How far in the future the launch deadline sits, counted from mount.
pub const COUNTDOWN_DAYS: i64 = 50;
pub const TICK_INTERVAL_MS: u32 = 1_000;

const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// Remaining time split into display units. Days are unbounded, the rest
/// stay inside their clock ranges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: u64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl TimeLeft {
    pub const ZERO: TimeLeft = TimeLeft { days: 0, hours: 0, minutes: 0, seconds: 0 };

    /// Floors a positive millisecond difference into days/hours/minutes/seconds.
    /// Anything at or below zero is clamped to `ZERO`.
    pub fn from_millis(millis: i64) -> Self {
        if millis <= 0 {
            return Self::ZERO;
        }
        Self {
            days: (millis / MS_PER_DAY) as u64,
            hours: ((millis % MS_PER_DAY) / MS_PER_HOUR) as u32,
            minutes: ((millis % MS_PER_HOUR) / MS_PER_MINUTE) as u32,
            seconds: ((millis % MS_PER_MINUTE) / MS_PER_SECOND) as u32,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400 + self.hours as u64 * 3_600 + self.minutes as u64 * 60 + self.seconds as u64
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Label/value pairs in display order, values zero-padded to two digits.
    pub fn units(&self) -> [(&'static str, String); 4] {
        [
            ("Days", pad2(self.days)),
            ("Hours", pad2(self.hours as u64)),
            ("Minutes", pad2(self.minutes as u64)),
            ("Seconds", pad2(self.seconds as u64)),
        ]
    }
}

pub fn pad2(value: u64) -> String {
    format!("{:02}", value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Remaining(TimeLeft),
    Expired,
}

/// Fixed launch instant, captured once when the page mounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(DateTime<Utc>);

impl Deadline {
    pub fn from_mount(mounted_at: DateTime<Utc>) -> Self {
        Deadline(mounted_at + Duration::days(COUNTDOWN_DAYS))
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn tick(&self, now: DateTime<Utc>) -> Tick {
        let difference = (self.0 - now).num_milliseconds();
        if difference <= 0 {
            Tick::Expired
        } else {
            Tick::Remaining(TimeLeft::from_millis(difference))
        }
    }
}

/// Countdown state as held by the landing page. Once `finished` is set the
/// value never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    deadline: Deadline,
    time_left: TimeLeft,
    finished: bool,
}

impl Countdown {
    pub fn mount(mounted_at: DateTime<Utc>) -> Self {
        Countdown {
            deadline: Deadline::from_mount(mounted_at),
            time_left: TimeLeft::ZERO,
            finished: false,
        }
        .advance(mounted_at)
    }

    pub fn advance(self, now: DateTime<Utc>) -> Self {
        if self.finished {
            return self;
        }
        match self.deadline.tick(now) {
            Tick::Remaining(time_left) => Countdown { time_left, ..self },
            Tick::Expired => Countdown {
                time_left: TimeLeft::ZERO,
                finished: true,
                ..self
            },
        }
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn time_left(&self) -> TimeLeft {
        self.time_left
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
