use serde::Serialize;

/// Percentage at or above which a tabulated student passes.
pub const PASS_PERCENT: f64 = 40.0;

/// A grade-detail record counts as passing strictly above this GPA.
/// Kept separate from `PASS_PERCENT`; the two are not the same rule.
pub const PASS_GPA_EXCLUSIVE: f64 = 1.5;

/// Largest subject maximum a subject exam may carry.
pub const MAX_TOTAL_MARKS: f64 = 10_000.0;

/// 1-decimal rounding used on every displayed percentage:
/// `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Unrounded percentage; 0 when there is no max.
pub fn raw_percentage(obtained: f64, max: f64) -> f64 {
    if max > 0.0 {
        obtained / max * 100.0
    } else {
        0.0
    }
}

pub fn percentage(obtained: f64, max: f64) -> f64 {
    round_off_1_decimal(raw_percentage(obtained, max))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Pass,
    Fail,
}

impl ResultStatus {
    pub fn from_percentage(percent: f64) -> Self {
        if percent >= PASS_PERCENT {
            ResultStatus::Pass
        } else {
            ResultStatus::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == ResultStatus::Pass
    }
}

pub fn gpa_passes(gpa: f64) -> bool {
    gpa > PASS_GPA_EXCLUSIVE
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub min_percent: f64,
    pub grade: &'static str,
    pub gpa: f64,
}

/// Descending by `min_percent`; the last band catches everything below.
pub const GRADE_SCALE: [GradeBand; 7] = [
    GradeBand { min_percent: 80.0, grade: "A+", gpa: 5.0 },
    GradeBand { min_percent: 70.0, grade: "A", gpa: 4.0 },
    GradeBand { min_percent: 60.0, grade: "A-", gpa: 3.5 },
    GradeBand { min_percent: 50.0, grade: "B", gpa: 3.0 },
    GradeBand { min_percent: 40.0, grade: "C", gpa: 2.0 },
    GradeBand { min_percent: 33.0, grade: "D", gpa: 1.0 },
    GradeBand { min_percent: 0.0, grade: "F", gpa: 0.0 },
];

pub fn grade_for_percent(percent: f64) -> &'static GradeBand {
    GRADE_SCALE
        .iter()
        .find(|b| percent >= b.min_percent)
        .unwrap_or(&GRADE_SCALE[GRADE_SCALE.len() - 1])
}

pub fn gpa_for_grade(grade: &str) -> Option<f64> {
    let g = grade.trim();
    GRADE_SCALE
        .iter()
        .find(|b| b.grade.eq_ignore_ascii_case(g))
        .map(|b| b.gpa)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    pub graded_count: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub ungraded_count: usize,
    pub pass_rate: f64,
}

/// Aggregate pass rate over GPA values. `None` entries have no GPA and stay
/// out of the denominator.
pub fn gpa_pass_stats<I>(gpas: I) -> PassStats
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut pass_count = 0_usize;
    let mut fail_count = 0_usize;
    let mut ungraded_count = 0_usize;
    for g in gpas {
        match g {
            Some(v) if gpa_passes(v) => pass_count += 1,
            Some(_) => fail_count += 1,
            None => ungraded_count += 1,
        }
    }
    let graded_count = pass_count + fail_count;
    PassStats {
        graded_count,
        pass_count,
        fail_count,
        ungraded_count,
        pass_rate: percentage(pass_count as f64, graded_count as f64),
    }
}
