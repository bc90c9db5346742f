//! Deterministic flame graph colors.
//!
//! Nothing here is stored between runs: a frame's color is a pure function
//! of its name, depth and position among its siblings, so the same package
//! gets the same hue in every graph.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use traceflame_protocol::{Oklch, RootCategory};

/// Lightness nudges by sibling position, ordered so neighbours differ a lot.
const SIBLING_OFFSETS: [f32; 10] = [4.0, 9.0, 3.0, 8.0, 2.0, 7.0, 1.0, 6.0, 0.0, 5.0];

static DEFAULT_PALETTE: LazyLock<Palette> = LazyLock::new(Palette::default);

/// Color of a frame with the default palette. See [`Palette::color`].
pub fn color(depth: u32, name: &str, sibling_index: usize, hovered: bool) -> Oklch {
    DEFAULT_PALETTE.color(depth, name, sibling_index, hovered)
}

/// 64-bit FNV-1a.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(PRIME)
    })
}

/// Where a function comes from, judged by its symbol name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance<'a> {
    Runtime,
    EntryPoint,
    Stdlib,
    /// A third-party package, identified by its import path.
    Package(&'a str),
}

impl<'a> Provenance<'a> {
    /// Classify `name`, a fully qualified symbol like
    /// `github.com/user/repo/pkg.(*T).Method`.
    pub fn of(name: &'a str, entry_package: &str) -> Self {
        if name.starts_with("runtime.") || name.starts_with("runtime/") || !name.contains('.') {
            return Self::Runtime;
        }
        if name
            .strip_prefix(entry_package)
            .is_some_and(|rest| rest.starts_with('.'))
        {
            return Self::EntryPoint;
        }
        // Module paths without a dot in their first element are reserved for
        // the standard library.
        let Some(slash) = name.find('/') else {
            return Self::Stdlib;
        };
        if !name[..slash].contains('.') {
            return Self::Stdlib;
        }
        let last_slash = name.rfind('/').unwrap_or(slash);
        let pkg_end = name[last_slash..]
            .find('.')
            .map_or(name.len(), |dot| last_slash + dot);
        Self::Package(&name[..pkg_end])
    }
}

/// Fixed colors of the root categories.
pub fn category_color(category: RootCategory) -> Oklch {
    const BLOCKED: Oklch = Oklch::from_percent(58.51, 0.122, 23.89);
    match category {
        RootCategory::Running => Oklch { h: 143.74, ..BLOCKED },
        // Rarest blocked state, darker to leave room for the others.
        RootCategory::Blocked => BLOCKED.shifted(-5.0, 0.0),
        RootCategory::Send
        | RootCategory::Recv
        | RootCategory::Select
        | RootCategory::Sync
        | RootCategory::SyncOnce
        | RootCategory::SyncCond => BLOCKED.shifted(10.0, 0.0),
        RootCategory::Gc | RootCategory::TriggeringGc => Oklch { h: 0.0, ..BLOCKED },
        RootCategory::Io => BLOCKED.shifted(6.0, -0.01),
        RootCategory::BlockingSyscall => BLOCKED,
        RootCategory::Ready => Oklch { h: 206.35, ..BLOCKED },
        RootCategory::Stuck => Oklch::new(0.0, 0.0, 0.0),
    }
}

/// Colors for frames below the root categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub hovered: Oklch,
    pub runtime: Oklch,
    pub stdlib: Oklch,
    pub entry_point: Oklch,
    /// Package whose functions get the `entry_point` color.
    pub entry_package: String,
    /// Lightness and chroma of hashed package colors. All hues are
    /// representable in sRGB at this combination.
    pub package_lightness: f32,
    pub package_chroma: f32,
    /// Degrees between hashed hues. Must divide 360.
    pub hue_step: f32,
    /// Lightness delta range spread over sibling positions.
    pub sibling_lightness: [f32; 2],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            hovered: Oklch::new(0.94, 0.222, 119.0),
            runtime: Oklch::new(0.5639, 0.272, 318.89),
            stdlib: Oklch::new(0.8179, 0.170_523, 77.948_1),
            entry_point: Oklch::new(0.5167, 0.134_812, 152.375_6),
            entry_package: "main".to_string(),
            package_lightness: 0.699,
            package_chroma: 0.103,
            hue_step: 20.0,
            sibling_lightness: [-0.05, 0.12],
        }
    }
}

impl Palette {
    /// Color of the frame `name` at `depth`, the `sibling_index`-th child of
    /// its parent.
    ///
    /// # Panics
    ///
    /// If `depth` is 0 and `name` is not a [`RootCategory`] label: the graph
    /// was fed a category nobody assigned a color to.
    #[allow(clippy::panic)]
    pub fn color(&self, depth: u32, name: &str, sibling_index: usize, hovered: bool) -> Oklch {
        if hovered {
            return self.hovered;
        }
        let base = if depth == 0 {
            match RootCategory::from_label(name) {
                Some(category) => category_color(category),
                None => panic!("no color for root category {name:?}"),
            }
        } else {
            self.frame_color(name)
        };
        self.for_sibling(base, sibling_index)
    }

    /// Base color of a frame by provenance, before sibling adjustment.
    pub fn frame_color(&self, name: &str) -> Oklch {
        match Provenance::of(name, &self.entry_package) {
            Provenance::Runtime => self.runtime,
            Provenance::EntryPoint => self.entry_point,
            Provenance::Stdlib => self.stdlib,
            Provenance::Package(path) => {
                Oklch::new(self.package_lightness, self.package_chroma, self.package_hue(path))
            }
        }
    }

    /// Hue bucket of an import path.
    pub fn package_hue(&self, import_path: &str) -> f32 {
        let buckets = (360.0 / self.hue_step).round().max(1.0) as u64;
        self.hue_step * (fnv1a64(import_path.as_bytes()) % buckets) as f32
    }

    fn for_sibling(&self, c: Oklch, sibling_index: usize) -> Oklch {
        let [min, max] = self.sibling_lightness;
        let v = SIBLING_OFFSETS[sibling_index % SIBLING_OFFSETS.len()];
        let delta = v / SIBLING_OFFSETS.len() as f32 * (max - min) + min;
        c.lightened(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_values() {
        assert_eq!(fnv1a64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn provenance_heuristics() {
        let of = |n| Provenance::of(n, "main");
        assert_eq!(of("runtime.mallocgc"), Provenance::Runtime);
        assert_eq!(of("runtime/internal/atomic.Load"), Provenance::Runtime);
        assert_eq!(of("gcWriteBarrier"), Provenance::Runtime);
        assert_eq!(of("main.main"), Provenance::EntryPoint);
        assert_eq!(of("main.(*server).run.func1"), Provenance::EntryPoint);
        assert_eq!(of("mainly.Foo"), Provenance::Stdlib);
        assert_eq!(of("sync.(*Mutex).Lock"), Provenance::Stdlib);
        assert_eq!(of("net/http.(*conn).serve"), Provenance::Stdlib);
        assert_eq!(
            of("github.com/user/repo/pkg.(*T).Method"),
            Provenance::Package("github.com/user/repo/pkg")
        );
        assert_eq!(
            of("golang.org/x/sync/errgroup.(*Group).Go.func1"),
            Provenance::Package("golang.org/x/sync/errgroup")
        );
    }

    #[test]
    fn entry_package_is_configurable() {
        assert_eq!(Provenance::of("app.Run", "app"), Provenance::EntryPoint);
        assert_eq!(Provenance::of("main.main", "app"), Provenance::Stdlib);
    }

    #[test]
    fn hover_overrides_everything() {
        let p = Palette::default();
        assert_eq!(p.color(0, "Running", 3, true), p.hovered);
        assert_eq!(p.color(4, "github.com/a/b.F", 7, true), p.hovered);
    }

    #[test]
    fn deterministic() {
        let name = "github.com/user/repo/pkg.(*T).Method";
        assert_eq!(color(2, name, 5, false), color(2, name, 5, false));
        assert_eq!(
            color(2, name, 5, false),
            Palette::default().color(2, name, 5, false)
        );
    }

    #[test]
    fn category_shades_derive_from_blocked() {
        let syscall = category_color(RootCategory::BlockingSyscall);
        let io = category_color(RootCategory::Io);
        assert!((io.l - (syscall.l + 0.06)).abs() < 1e-5);
        assert!((io.c - 0.112).abs() < 1e-5);
        assert_eq!(io.h, syscall.h);
        assert!(category_color(RootCategory::Blocked).l < syscall.l);
        assert!(category_color(RootCategory::Recv).l > io.l);
        assert_eq!(category_color(RootCategory::Running).c, syscall.c);
        assert_eq!(category_color(RootCategory::Gc).h, 0.0);
        assert_eq!(category_color(RootCategory::Stuck).l, 0.0);
    }

    #[test]
    fn same_package_same_hue() {
        let p = Palette::default();
        let a = p.frame_color("github.com/user/repo/pkg.Foo");
        let b = p.frame_color("github.com/user/repo/pkg.(*Bar).Baz.func2");
        assert_eq!(a, b);
        assert!(a.h % 20.0 == 0.0 && a.h < 360.0);
    }

    #[test]
    fn colliding_packages_share_a_hue() {
        let p = Palette::default();
        let target = p.package_hue("github.com/a/one");
        // Search for a different path landing in the same bucket.
        let twin = (0..10_000)
            .map(|i| format!("github.com/b/pkg{i}"))
            .find(|path| p.package_hue(path) == target)
            .unwrap();
        let a = p.color(3, "github.com/a/one.F", 0, false);
        let b = p.color(3, &format!("{twin}.G"), 0, false);
        assert_eq!(a.h, b.h);
        assert_eq!(a, b);
    }

    #[test]
    fn sibling_offsets_follow_permutation() {
        let p = Palette::default();
        let base = p.frame_color("sync.(*Mutex).Lock");
        let l = |i| p.color(1, "sync.(*Mutex).Lock", i, false).l;
        // Offset 0 is the darkest, offset 9 the lightest.
        assert!((l(8) - (base.l - 0.05)).abs() < 1e-5);
        assert!((l(1) - (base.l + 0.9 * 0.17 - 0.05)).abs() < 1e-5);
        // Wraps around.
        assert_eq!(l(3), l(13));
        assert!(l(0) != l(1));
    }

    #[test]
    fn lightness_is_clamped() {
        let p = Palette {
            stdlib: Oklch::new(0.99, 0.1, 10.0),
            ..Palette::default()
        };
        assert_eq!(p.color(1, "fmt.Println", 1, false).l, 1.0);
    }

    #[test]
    fn root_categories_use_fixed_table() {
        let p = Palette::default();
        let running = p.color(0, "Running", 8, false);
        assert!((running.h - 143.74).abs() < 1e-4);
        // All happens-before blocking shares one color.
        assert_eq!(p.color(0, "send", 0, false), p.color(0, "sync.Cond", 0, false));
        assert_eq!(p.color(0, "GC", 0, false), p.color(0, "triggering GC", 0, false));
        // A frame named like a category below depth 0 is just a frame.
        assert_eq!(p.color(1, "Running", 0, false), p.for_sibling(p.runtime, 0));
    }

    #[test]
    #[should_panic(expected = "no color for root category")]
    fn unknown_root_category_is_fatal() {
        Palette::default().color(0, "napping", 0, false);
    }
}
