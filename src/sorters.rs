//! The comparison-sort algorithm set.
//!
//! Each algorithm sorts a clone of the file's line-reference array in place
//! and accounts its work in a [`SortCounters`]: `iterations` counts trips
//! through the comparison loop, `swaps` counts element moves. The `qsort`
//! variant delegates to the standard library and reports no counters.

/// Work counters accumulated by one sort run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortCounters {
    pub iterations: i32,
    pub swaps: i32,
}

/// The selectable sort algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Bubble,
    Merge,
    Quick,
    Shell,
    /// Standard-library unstable sort; counters stay at zero.
    System,
}

impl Algorithm {
    /// Parse a command-line tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "bubble" => Some(Self::Bubble),
            "merge" => Some(Self::Merge),
            "quick" => Some(Self::Quick),
            "shell" => Some(Self::Shell),
            "qsort" => Some(Self::System),
            _ => None,
        }
    }

    /// Human-readable name as published in the shared region.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bubble => "bubble",
            Self::Merge => "merge",
            Self::Quick => "quick",
            Self::Shell => "shell",
            Self::System => "qsort",
        }
    }

    /// Sort `lines` in place, returning the work counters.
    pub fn run(&self, lines: &mut [&str]) -> SortCounters {
        let mut counters = SortCounters::default();
        match self {
            Self::Bubble => bubble_sort(lines, &mut counters),
            Self::Merge => merge_sort(lines, &mut counters),
            Self::Quick => quick_sort(lines, &mut counters),
            Self::Shell => shell_sort(lines, &mut counters),
            Self::System => lines.sort_unstable(),
        }
        counters
    }
}

/// Drop duplicate selections, keeping the first occurrence of each.
pub fn dedup_preserving_order(algorithms: &[Algorithm]) -> Vec<Algorithm> {
    let mut unique = Vec::with_capacity(algorithms.len());
    for &algorithm in algorithms {
        if !unique.contains(&algorithm) {
            unique.push(algorithm);
        }
    }
    unique
}

/// Comma-join the algorithm names for the control segment.
pub fn join_names(algorithms: &[Algorithm]) -> String {
    algorithms
        .iter()
        .map(|a| a.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn bubble_sort(lines: &mut [&str], counters: &mut SortCounters) {
    if lines.len() < 2 {
        return;
    }
    for i in (1..lines.len()).rev() {
        let mut swapped = false;
        for j in 0..i {
            counters.iterations += 1;
            if lines[j] > lines[j + 1] {
                counters.swaps += 1;
                lines.swap(j, j + 1);
                swapped = true;
            }
        }
        // Already sorted; the remaining passes would compare for nothing.
        if !swapped {
            break;
        }
    }
}

fn merge_sort(lines: &mut [&str], counters: &mut SortCounters) {
    let mut scratch = lines.to_vec();
    merge_rec(lines, &mut scratch, counters);
}

fn merge_rec<'a>(lines: &mut [&'a str], scratch: &mut [&'a str], counters: &mut SortCounters) {
    let size = lines.len();
    if size <= 1 {
        return;
    }
    let half = size / 2;
    merge_rec(&mut lines[..half], scratch, counters);
    merge_rec(&mut lines[half..], scratch, counters);

    let (mut i1, mut i2, mut out) = (0, half, 0);
    while i1 < half && i2 < size {
        counters.iterations += 1;
        if lines[i1] < lines[i2] {
            scratch[out] = lines[i1];
            i1 += 1;
        } else {
            scratch[out] = lines[i2];
            i2 += 1;
        }
        out += 1;
    }
    while i1 < half {
        counters.swaps += 1;
        scratch[out] = lines[i1];
        i1 += 1;
        out += 1;
    }
    while i2 < size {
        counters.swaps += 1;
        scratch[out] = lines[i2];
        i2 += 1;
        out += 1;
    }
    lines.copy_from_slice(&scratch[..size]);
}

fn quick_sort(lines: &mut [&str], counters: &mut SortCounters) {
    if lines.len() < 2 {
        return;
    }
    quick_rec(lines, 0, (lines.len() - 1) as isize, counters);
}

fn quick_rec(lines: &mut [&str], mut begin: isize, mut end: isize, counters: &mut SortCounters) {
    // Loop instead of recursing on the longer side keeps the stack shallow.
    while begin < end {
        counters.iterations += 1;
        let (mut l, mut p, mut r) = (begin, (begin + end) / 2, end);
        let pivot = lines[p as usize];
        loop {
            while l <= r && lines[l as usize] <= pivot {
                l += 1;
            }
            while l <= r && lines[r as usize] > pivot {
                r -= 1;
            }
            if l > r {
                break;
            }
            lines.swap(l as usize, r as usize);
            counters.swaps += 1;
            if p == r {
                p = l;
            }
            l += 1;
            r -= 1;
        }
        lines[p as usize] = lines[r as usize];
        lines[r as usize] = pivot;
        r -= 1;
        if r - begin < end - l {
            quick_rec(lines, begin, r, counters);
            begin = l;
        } else {
            quick_rec(lines, l, end, counters);
            end = r;
        }
    }
}

fn shell_sort(lines: &mut [&str], counters: &mut SortCounters) {
    let n = lines.len() as isize;
    let mut gap: isize = 1;
    loop {
        gap = 3 * gap + 1;
        if gap >= n {
            break;
        }
    }
    loop {
        gap /= 3;
        for i in gap..n {
            counters.iterations += 1;
            let held = lines[i as usize];
            let mut j = i - gap;
            while j >= 0 && held < lines[j as usize] {
                counters.swaps += 1;
                lines[(j + gap) as usize] = lines[j as usize];
                j -= gap;
            }
            lines[(j + gap) as usize] = held;
        }
        if gap <= 1 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [Algorithm; 5] = [
        Algorithm::Bubble,
        Algorithm::Merge,
        Algorithm::Quick,
        Algorithm::Shell,
        Algorithm::System,
    ];

    fn sorted_reference(input: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn every_algorithm_sorts() {
        let input = ["pear", "apple", "fig", "banana", "apple", "date"];
        for algorithm in ALL {
            let mut lines: Vec<&str> = input.to_vec();
            algorithm.run(&mut lines);
            assert_eq!(lines, sorted_reference(&input), "{}", algorithm.name());
        }
    }

    #[test]
    fn empty_and_singleton_inputs() {
        for algorithm in ALL {
            let mut empty: Vec<&str> = vec![];
            algorithm.run(&mut empty);
            assert!(empty.is_empty());

            let mut one = vec!["only"];
            algorithm.run(&mut one);
            assert_eq!(one, ["only"]);
        }
    }

    #[test]
    fn bubble_counts_comparisons_and_swaps() {
        let mut lines = vec!["c", "b", "a"];
        let counters = Algorithm::Bubble.run(&mut lines);
        assert_eq!(lines, ["a", "b", "c"]);
        // Two passes of a 3-element reverse list: 2 + 1 comparisons, 3 swaps.
        assert_eq!(counters.iterations, 3);
        assert_eq!(counters.swaps, 3);
    }

    #[test]
    fn bubble_early_exit_on_sorted_input() {
        let mut lines = vec!["a", "b", "c", "d"];
        let counters = Algorithm::Bubble.run(&mut lines);
        // One clean pass, then the early exit.
        assert_eq!(counters.iterations, 3);
        assert_eq!(counters.swaps, 0);
    }

    #[test]
    fn system_sort_reports_no_counters() {
        let mut lines = vec!["z", "m", "a", "q"];
        let counters = Algorithm::System.run(&mut lines);
        assert_eq!(counters, SortCounters::default());
        assert_eq!(lines, ["a", "m", "q", "z"]);
    }

    #[test]
    fn counted_sorts_do_work_on_unsorted_input() {
        for algorithm in [Algorithm::Bubble, Algorithm::Merge, Algorithm::Quick, Algorithm::Shell] {
            let mut lines = vec!["delta", "alpha", "charlie", "bravo"];
            let counters = algorithm.run(&mut lines);
            assert!(counters.iterations > 0, "{}", algorithm.name());
        }
    }

    #[test]
    fn parse_accepts_known_tags_only() {
        assert_eq!(Algorithm::parse("bubble"), Some(Algorithm::Bubble));
        assert_eq!(Algorithm::parse("qsort"), Some(Algorithm::System));
        assert_eq!(Algorithm::parse("heap"), None);
        assert_eq!(Algorithm::parse("Bubble"), None);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let tags = [
            Algorithm::Quick,
            Algorithm::Bubble,
            Algorithm::Quick,
            Algorithm::Shell,
            Algorithm::Bubble,
        ];
        assert_eq!(
            dedup_preserving_order(&tags),
            vec![Algorithm::Quick, Algorithm::Bubble, Algorithm::Shell]
        );
    }

    #[test]
    fn join_names_is_comma_separated() {
        let tags = [Algorithm::Quick, Algorithm::Bubble];
        assert_eq!(join_names(&tags), "quick, bubble");
    }

    proptest! {
        #[test]
        fn algorithms_agree_with_std_sort(input in proptest::collection::vec("[a-z]{0,12}", 0..64)) {
            let reference = {
                let mut v = input.clone();
                v.sort_unstable();
                v
            };
            for algorithm in ALL {
                let mut lines: Vec<&str> = input.iter().map(|s| s.as_str()).collect();
                algorithm.run(&mut lines);
                prop_assert_eq!(&lines, &reference, "{}", algorithm.name());
            }
        }

        #[test]
        fn dedup_is_idempotent(selection in proptest::collection::vec(0usize..5, 0..16)) {
            let tags: Vec<Algorithm> = selection.iter().map(|&i| ALL[i]).collect();
            let once = dedup_preserving_order(&tags);
            let twice = dedup_preserving_order(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
