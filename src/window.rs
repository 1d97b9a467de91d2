//! Window functions
//!
//! All functions are periodic (DFT-even), not symmetric. That is what you
//! want before an FFT, and it's what FreqShow asked scipy for.
//!
//! https://en.wikipedia.org/wiki/Window_function
//! https://en.wikipedia.org/wiki/Spectral_leakage
use crate::{Error, Float};

const PI: Float = std::f64::consts::PI as Float;

/// Window function kinds selectable in the filter dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Rectangular. No windowing at all.
    Boxcar,
    /// Hann.
    Hann,
    /// Hamming.
    Hamming,
    /// Blackman.
    Blackman,
    /// Blackman-Harris, 4 term.
    BlackmanHarris,
    /// Triangular.
    Bartlett,
    /// Modified Bartlett-Hann.
    BartHann,
    /// Nuttall, 4 term.
    Nuttall,
    /// Kaiser. The beta parameter is kept separately.
    Kaiser,
}

impl WindowKind {
    /// All kinds, in the order the filter dialog shows them.
    pub const ALL: [WindowKind; 9] = [
        WindowKind::Boxcar,
        WindowKind::Hann,
        WindowKind::Hamming,
        WindowKind::Blackman,
        WindowKind::BlackmanHarris,
        WindowKind::Bartlett,
        WindowKind::BartHann,
        WindowKind::Nuttall,
        WindowKind::Kaiser,
    ];

    /// Name, as shown on screen and stored in settings.
    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Boxcar => "boxcar",
            WindowKind::Hann => "hann",
            WindowKind::Hamming => "hamming",
            WindowKind::Blackman => "blackman",
            WindowKind::BlackmanHarris => "blackmanharris",
            WindowKind::Bartlett => "bartlett",
            WindowKind::BartHann => "barthann",
            WindowKind::Nuttall => "nuttall",
            WindowKind::Kaiser => "kaiser",
        }
    }

    /// Short name, for buttons.
    pub fn short_name(&self) -> &'static str {
        match self {
            WindowKind::BlackmanHarris => "bharris",
            other => other.name(),
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for WindowKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim().to_ascii_lowercase();
        WindowKind::ALL
            .iter()
            .find(|k| k.name() == s || k.short_name() == s)
            .copied()
            .ok_or_else(|| Error::invalid("window", s))
    }
}

/// Create a window of the given kind.
///
/// `beta` is only used by Kaiser.
pub fn window(kind: WindowKind, n: usize, beta: Float) -> Vec<Float> {
    if n < 2 {
        return vec![1.0; n];
    }
    match kind {
        WindowKind::Boxcar => vec![1.0; n],
        WindowKind::Hann => cosine_sum(n, &[0.5, 0.5]),
        WindowKind::Hamming => hamming(n),
        WindowKind::Blackman => blackman(n),
        WindowKind::BlackmanHarris => blackman_harris(n),
        WindowKind::Bartlett => bartlett(n),
        WindowKind::BartHann => barthann(n),
        WindowKind::Nuttall => cosine_sum(n, &[0.3635819, 0.4891775, 0.1365995, 0.0106411]),
        WindowKind::Kaiser => kaiser(n, beta),
    }
}

// Generalized cosine window, with alternating signs:
// a0 - a1 cos(x) + a2 cos(2x) - a3 cos(3x) …
fn cosine_sum(m: usize, a: &[Float]) -> Vec<Float> {
    (0..m)
        .map(|n| {
            let t = 2.0 * PI * n as Float / m as Float;
            a.iter()
                .enumerate()
                .map(|(k, ak)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * ak * (k as Float * t).cos()
                })
                .sum()
        })
        .collect()
}

/// Create Hamming window.
///
/// https://en.wikipedia.org/wiki/Window_function#Hann_and_Hamming_windows
pub fn hamming(ntaps: usize) -> Vec<Float> {
    // a0 notes:
    //
    // 0.54 is commonly used (and is what scipy uses), but Hamming's paper
    // sets it as 25/46.
    //
    // "In the equiripple sense, the optimal values for the
    // coefficients are a0 = 0.53836 and a1 = 0.46164".
    //
    // See wikipedia.
    let a0 = 0.54;
    let a1 = 1.0 - a0;
    let m = ntaps as Float;
    (0..ntaps)
        .map(|n| a0 - a1 * (2.0 * PI * (n as Float) / m).cos())
        .collect()
}

/// Create Blackman window.
///
/// https://en.wikipedia.org/wiki/Window_function#Blackman_window
pub fn blackman(m: usize) -> Vec<Float> {
    let mut b = Vec::with_capacity(m);
    for n in 0..m {
        let n = n as Float;
        let m = m as Float;

        // Blackman's "not very serious proposal" magic value: 0.16.
        let a = 0.16;

        // The truncated coefficients do not null the sidelobes as
        // well as "exact Blackman", but have an improved 18 dB/oct
        // fall-off (compared do 6dB for exact).
        let a0 = (1.0 - a) / 2.0;
        let a1 = 0.5;
        let a2 = a / 2.0;

        // Formula.
        let t1 = 2.0 * PI * n / m;
        let t2 = 4.0 * PI * n / m;
        b.push(a0 - a1 * t1.cos() + a2 * t2.cos());
    }
    b
}

/// Create Blackman-Harris window.
///
/// https://en.wikipedia.org/wiki/Window_function#Blackman%E2%80%93Harris_window
pub fn blackman_harris(m: usize) -> Vec<Float> {
    let mut b = Vec::with_capacity(m);
    for n in 0..m {
        let n = n as Float;
        let m = m as Float;

        // Parameters.
        const A0: Float = 0.35875;
        const A1: Float = 0.48829;
        const A2: Float = 0.14128;
        const A3: Float = 0.01168;

        // Formula.
        let t1 = 2.0 * PI * n / m;
        let t2 = 4.0 * PI * n / m;
        let t3 = 6.0 * PI * n / m;
        b.push(A0 - A1 * t1.cos() + A2 * t2.cos() - A3 * t3.cos());
    }
    b
}

/// Create triangular (Bartlett) window. Zero at both ends of the period.
pub fn bartlett(m: usize) -> Vec<Float> {
    let mf = m as Float;
    (0..m)
        .map(|n| 1.0 - (2.0 * n as Float / mf - 1.0).abs())
        .collect()
}

/// Create modified Bartlett-Hann window.
pub fn barthann(m: usize) -> Vec<Float> {
    let mf = m as Float;
    (0..m)
        .map(|n| {
            let fac = (n as Float / mf - 0.5).abs();
            0.62 - 0.48 * fac + 0.38 * (2.0 * PI * fac).cos()
        })
        .collect()
}

/// Create Kaiser window.
///
/// Beta 0 is rectangular, 5 is similar to Hamming, 6 to Hann, and 8.6 to
/// Blackman.
///
/// https://en.wikipedia.org/wiki/Kaiser_window
pub fn kaiser(m: usize, beta: Float) -> Vec<Float> {
    let beta = beta as f64;
    let mf = m as f64;
    let denom = bessel_i0(beta);
    (0..m)
        .map(|n| {
            let r = 2.0 * n as f64 / mf - 1.0;
            (bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / denom) as Float
        })
        .collect()
}

/// Zeroth order modified Bessel function of the first kind.
///
/// Power series. Converges fast for the betas a window ever uses.
fn bessel_i0(x: f64) -> f64 {
    let q = x * x / 4.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..200 {
        term *= q / (k as f64 * k as f64);
        sum += term;
        if term < sum * 1e-16 {
            break;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_almost_equal_float;

    #[test]
    fn tiny() {
        for kind in WindowKind::ALL {
            assert!(window(kind, 0, 8.6).is_empty());
            assert_eq!(window(kind, 1, 8.6), vec![1.0]);
        }
    }

    #[test]
    fn periodic_symmetry() {
        // Periodic windows are symmetric around n/2: w[k] == w[n-k].
        for kind in WindowKind::ALL {
            for n in [8, 9, 64] {
                let w = window(kind, n, 5.0);
                assert_eq!(w.len(), n);
                for k in 1..n {
                    assert!(
                        (w[k] - w[n - k]).abs() < 1e-4,
                        "{kind} n={n} k={k}: {} vs {}",
                        w[k],
                        w[n - k]
                    );
                }
            }
        }
    }

    #[test]
    fn peaks_in_middle() {
        for kind in WindowKind::ALL {
            let w = window(kind, 16, 8.6);
            let max = w.iter().cloned().fold(Float::MIN, Float::max);
            assert!((w[8] - max).abs() < 1e-6, "{kind}: {w:?}");
            assert!((w[8] - 1.0).abs() < 1e-3, "{kind}: {w:?}");
        }
    }

    #[test]
    fn known_values() {
        assert_almost_equal_float(&window(WindowKind::Boxcar, 4, 0.0), &[1.0; 4]);
        assert_almost_equal_float(&window(WindowKind::Hann, 4, 0.0), &[0.0, 0.5, 1.0, 0.5]);
        assert_almost_equal_float(
            &window(WindowKind::Hamming, 4, 0.0),
            &[0.08, 0.54, 1.0, 0.54],
        );
        assert_almost_equal_float(
            &window(WindowKind::Bartlett, 4, 0.0),
            &[0.0, 0.5, 1.0, 0.5],
        );
        assert_almost_equal_float(
            &window(WindowKind::Blackman, 4, 0.0),
            &[0.0, 0.34, 1.0, 0.34],
        );
        // Nuttall ends are not quite zero.
        let w = window(WindowKind::Nuttall, 4, 0.0);
        assert!((w[0] - 0.0003628).abs() < 1e-5, "{w:?}");
    }

    #[test]
    fn kaiser_beta() {
        // Beta zero is rectangular.
        assert_almost_equal_float(&window(WindowKind::Kaiser, 8, 0.0), &[1.0; 8]);
        // Larger beta, smaller ends.
        let w5 = window(WindowKind::Kaiser, 8, 5.0);
        let w9 = window(WindowKind::Kaiser, 8, 9.0);
        assert!(w9[0] < w5[0]);
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.2660658777520082).abs() < 1e-12);
    }

    #[test]
    fn names() -> crate::Result<()> {
        for kind in WindowKind::ALL {
            assert_eq!(kind.name().parse::<WindowKind>()?, kind);
            assert_eq!(kind.short_name().parse::<WindowKind>()?, kind);
        }
        assert_eq!("bharris".parse::<WindowKind>()?, WindowKind::BlackmanHarris);
        assert!("gauss".parse::<WindowKind>().is_err());
        Ok(())
    }
}
