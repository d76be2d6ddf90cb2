//! Color primaries and gamut conversion matrices.
//!
//! RGB-to-RGB matrices go through CIE XYZ. When the white points differ a
//! Bradford chromatic adaptation is folded in, so white stays white:
//!
//! ```text
//! RGB_dst = XYZ_to_dst * Bradford(src_white -> dst_white) * src_to_XYZ * RGB_src
//! ```
//!
//! # Example
//!
//! ```rust
//! use hdrstack_color::primaries::{gamut_matrix, Gamut};
//! use glam::Vec3;
//!
//! let m = gamut_matrix(Gamut::P3D65, Gamut::AcesAp1);
//! let white = m * Vec3::ONE;
//! assert!((white - Vec3::ONE).abs().max_element() < 1e-3);
//! ```

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CIE 1931 xy chromaticities of an RGB gamut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primaries {
    /// Red primary (x, y)
    pub r: (f32, f32),
    /// Green primary (x, y)
    pub g: (f32, f32),
    /// Blue primary (x, y)
    pub b: (f32, f32),
    /// White point (x, y)
    pub w: (f32, f32),
}

impl Primaries {
    /// White point as XYZ (Y=1).
    #[inline]
    pub fn white_xyz(&self) -> Vec3 {
        xy_to_xyz(self.w.0, self.w.1)
    }
}

/// D65 white point chromaticity.
pub const D65_XY: (f32, f32) = (0.31270, 0.32900);
/// ACES white point chromaticity (approximately D60).
pub const D60_XY: (f32, f32) = (0.32168, 0.33767);

/// Rec.709 / sRGB primaries.
pub const REC709: Primaries = Primaries {
    r: (0.6400, 0.3300),
    g: (0.3000, 0.6000),
    b: (0.1500, 0.0600),
    w: D65_XY,
};

/// Display P3 primaries (DCI-P3 with D65 white).
pub const P3_D65: Primaries = Primaries {
    r: (0.6800, 0.3200),
    g: (0.2650, 0.6900),
    b: (0.1500, 0.0600),
    w: D65_XY,
};

/// Rec.2020 primaries.
pub const REC2020: Primaries = Primaries {
    r: (0.7080, 0.2920),
    g: (0.1700, 0.7970),
    b: (0.1310, 0.0460),
    w: D65_XY,
};

/// ACES AP0 primaries (ACES2065-1).
pub const ACES_AP0: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.0000, 1.0000),
    b: (0.0001, -0.0770),
    w: D60_XY,
};

/// ACES AP1 primaries (ACEScg working space).
pub const ACES_AP1: Primaries = Primaries {
    r: (0.7130, 0.2930),
    g: (0.1650, 0.8300),
    b: (0.1280, 0.0440),
    w: D60_XY,
};

/// Bradford cone response matrix.
pub const BRADFORD: Mat3 = from_rows([
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
]);

const fn from_rows(r: [[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(r[0][0], r[1][0], r[2][0]),
        Vec3::new(r[0][1], r[1][1], r[2][1]),
        Vec3::new(r[0][2], r[1][2], r[2][2]),
    )
}

/// Named RGB gamuts a colorspace can be defined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamut {
    /// Rec.709 / sRGB
    Rec709,
    /// Display P3
    P3D65,
    /// Rec.2020
    Rec2020,
    /// ACES AP0
    AcesAp0,
    /// ACES AP1
    AcesAp1,
}

impl Gamut {
    /// Chromaticities of this gamut.
    pub const fn primaries(self) -> Primaries {
        match self {
            Gamut::Rec709 => REC709,
            Gamut::P3D65 => P3_D65,
            Gamut::Rec2020 => REC2020,
            Gamut::AcesAp0 => ACES_AP0,
            Gamut::AcesAp1 => ACES_AP1,
        }
    }
}

impl fmt::Display for Gamut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gamut::Rec709 => "Rec.709",
            Gamut::P3D65 => "P3-D65",
            Gamut::Rec2020 => "Rec.2020",
            Gamut::AcesAp0 => "ACES AP0",
            Gamut::AcesAp1 => "ACES AP1",
        })
    }
}

fn xy_to_xyz(x: f32, y: f32) -> Vec3 {
    if y.abs() < 1e-10 {
        Vec3::ZERO
    } else {
        Vec3::new(x / y, 1.0, (1.0 - x - y) / y)
    }
}

/// RGB to XYZ matrix for a set of primaries.
///
/// Columns are the primaries in XYZ, scaled so RGB white maps to the
/// white point with Y=1.
pub fn rgb_to_xyz_matrix(p: &Primaries) -> Mat3 {
    let r = xy_to_xyz(p.r.0, p.r.1);
    let g = xy_to_xyz(p.g.0, p.g.1);
    let b = xy_to_xyz(p.b.0, p.b.1);
    let w = p.white_xyz();

    let m = Mat3::from_cols(r, g, b);
    let s = m.inverse() * w;
    Mat3::from_cols(r * s.x, g * s.y, b * s.z)
}

/// XYZ to RGB matrix, the inverse of [`rgb_to_xyz_matrix`].
pub fn xyz_to_rgb_matrix(p: &Primaries) -> Mat3 {
    rgb_to_xyz_matrix(p).inverse()
}

/// Chromatic adaptation between two XYZ white points.
pub fn adapt_matrix(method: Mat3, src_white: Vec3, dst_white: Vec3) -> Mat3 {
    let src_cone = method * src_white;
    let dst_cone = method * dst_white;
    let scale = Mat3::from_diagonal(dst_cone / src_cone);
    method.inverse() * scale * method
}

/// Full linear RGB to linear RGB conversion, Bradford-adapted.
pub fn gamut_matrix(from: Gamut, to: Gamut) -> Mat3 {
    if from == to {
        return Mat3::IDENTITY;
    }
    let src = from.primaries();
    let dst = to.primaries();
    let to_xyz = rgb_to_xyz_matrix(&src);
    let from_xyz = xyz_to_rgb_matrix(&dst);
    if src.w == dst.w {
        from_xyz * to_xyz
    } else {
        let cat = adapt_matrix(BRADFORD, src.white_xyz(), dst.white_xyz());
        from_xyz * cat * to_xyz
    }
}
