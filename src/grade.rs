/// Letter-grade bands applied when marks are entered for an exam.
/// Cutoffs are inclusive and checked highest-first.
pub const GRADE_BANDS: [(f64, &str); 6] = [
    (80.0, "A+"),
    (70.0, "A"),
    (60.0, "A-"),
    (50.0, "B"),
    (40.0, "C"),
    (33.0, "D"),
];

/// Derives a letter grade from `marks_obtained`, which is read directly as a
/// percentage out of 100. The owning exam's `max_marks` is not consulted.
pub fn grade_for(marks_obtained: f64) -> &'static str {
    for (cutoff, grade) in GRADE_BANDS {
        if marks_obtained >= cutoff {
            return grade;
        }
    }
    "F"
}
