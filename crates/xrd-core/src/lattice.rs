use std::f64::consts::{PI, TAU};

use log::debug;
use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::constants::{
    top_row_spacing_half, LATTICE_TOLERANCE, MAX_GRID_INDEX, VIEW_HALF_EXTENT,
};
use crate::error::{Result, XrdError};

/// Mirror images of one grid quadrant, in generation order.
const QUADRANTS: [(f64, f64); 4] = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];

/// Orthorhombic lattice constants in ångström.
///
/// Only `a` (in-plane repeat) and `c` (interplane spacing) enter the 2D
/// geometry. `b` is carried for the reciprocal basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeConstants {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for LatticeConstants {
    /// YBCO, a high-Tc superconductor.
    fn default() -> Self {
        Self {
            a: 3.82,
            b: 3.89,
            c: 7.8,
        }
    }
}

impl LatticeConstants {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Fail fast on constants that would turn the geometry into NaN.
    pub fn validate(&self) -> Result<()> {
        check_constant("a", self.a)?;
        check_constant("c", self.c)
    }

    /// Reciprocal lattice lengths (2π/a, 2π/b, 2π/c).
    pub fn reciprocal_basis(&self) -> [f64; 3] {
        [2.0 * PI / self.a, 2.0 * PI / self.b, 2.0 * PI / self.c]
    }
}

fn check_constant(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(XrdError::InvalidLatticeConstant { name, value })
    }
}

/// Generated lattice sites together with the anchor used to place the
/// diffracting plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeSites {
    /// Highest site of the centre column: the top-centre atom that the
    /// first incident ray hits.
    pub anchor: Point2<f64>,
    /// Every site in the viewing window, unscaled.
    pub sites: Vec<Point2<f64>>,
    /// Half the horizontal spacing of the top row; bounds the centre column.
    pub top_row_spacing_half: f64,
}

impl LatticeSites {
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point2<f64>> {
        self.sites.iter()
    }
}

/// Largest grid indices `(x, y)` that keep the lattice inside the window.
///
/// Constants so small that the window would need more than
/// [`MAX_GRID_INDEX`] rows or columns are rejected.
pub fn bounding_indices(constants: &LatticeConstants, view_extent: f64) -> Result<(usize, usize)> {
    let max_x = grid_index("a", constants.a, view_extent)?;
    let max_y = grid_index("c", constants.c, view_extent)?;
    Ok((max_x, max_y))
}

fn grid_index(name: &'static str, value: f64, view_extent: f64) -> Result<usize> {
    let count = (view_extent / value).ceil().max(0.0);
    if count.is_finite() && count <= MAX_GRID_INDEX as f64 {
        Ok(count as usize)
    } else {
        Err(XrdError::InvalidLatticeConstant { name, value })
    }
}

/// Generate every lattice site visible within `view_extent` of the origin
/// for a lattice rotated by `orientation` radians.
///
/// Each rectangular grid point `(x·a, y·c)` of the first quadrant is
/// mirrored across both axes and rotated, so the result always holds
/// `4·(X+1)·(Y+1)` points and is symmetric under `p → −p`.
pub fn generate_sites(
    constants: &LatticeConstants,
    orientation: f64,
    view_extent: f64,
) -> Result<LatticeSites> {
    constants.validate()?;

    let orientation = orientation.rem_euclid(TAU);
    let (max_x, max_y) = bounding_indices(constants, view_extent)?;
    let rotation = Rotation2::new(orientation);
    let half_spacing = top_row_spacing_half(constants.a, constants.c, orientation);

    let capacity = (max_x + 1)
        .checked_mul(max_y + 1)
        .and_then(|n| n.checked_mul(QUADRANTS.len()))
        .ok_or(XrdError::InvalidLatticeConstant {
            name: "a",
            value: constants.a,
        })?;
    let mut sites = Vec::with_capacity(capacity);
    for x in 0..=max_x {
        for y in 0..=max_y {
            let grid = Vector2::new(x as f64 * constants.a, y as f64 * constants.c);
            for (sx, sy) in QUADRANTS {
                let mirrored = Vector2::new(sx * grid.x, sy * grid.y);
                sites.push(Point2::from(rotation * mirrored));
            }
        }
    }

    let anchor = select_anchor(&sites, half_spacing);
    debug!(
        "generated {} lattice sites (a={}, c={}, θ={:.4}), anchor ({:.3}, {:.3}), half spacing {:.3}",
        sites.len(),
        constants.a,
        constants.c,
        orientation,
        anchor.x,
        anchor.y,
        half_spacing
    );

    Ok(LatticeSites {
        anchor,
        sites,
        top_row_spacing_half: half_spacing,
    })
}

/// Pick the highest site whose x lies within the top-row half spacing.
///
/// Ties on height go to the site nearest x = 0, then to the one on the
/// right, so the choice does not depend on the order of `sites`.
fn select_anchor(sites: &[Point2<f64>], half_spacing: f64) -> Point2<f64> {
    let mut anchor = Point2::origin();
    for site in sites
        .iter()
        .filter(|s| s.x.abs() <= half_spacing + LATTICE_TOLERANCE)
    {
        if ranks_above(site, &anchor) {
            anchor = *site;
        }
    }
    anchor
}

fn ranks_above(site: &Point2<f64>, current: &Point2<f64>) -> bool {
    let dy = site.y - current.y;
    if dy.abs() > LATTICE_TOLERANCE {
        return dy > 0.0;
    }
    let dx = site.x.abs() - current.x.abs();
    if dx.abs() > LATTICE_TOLERANCE {
        return dx < 0.0;
    }
    site.x > current.x + LATTICE_TOLERANCE
}

/// A crystal sample: lattice constants, orientation and the site set they
/// produce. The sites are rebuilt from scratch on every change.
#[derive(Debug, Clone)]
pub struct Lattice {
    constants: LatticeConstants,
    orientation: f64,
    view_extent: f64,
    sites: LatticeSites,
}

impl Lattice {
    pub fn new(constants: LatticeConstants, orientation: f64) -> Result<Self> {
        Self::with_extent(constants, orientation, VIEW_HALF_EXTENT)
    }

    pub fn with_extent(constants: LatticeConstants, orientation: f64, view_extent: f64) -> Result<Self> {
        let sites = generate_sites(&constants, orientation, view_extent)?;
        Ok(Self {
            constants,
            orientation,
            view_extent,
            sites,
        })
    }

    pub fn constants(&self) -> &LatticeConstants {
        &self.constants
    }

    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn sites(&self) -> &LatticeSites {
        &self.sites
    }

    pub fn anchor(&self) -> Point2<f64> {
        self.sites.anchor
    }

    /// Change `a` and `c`. On error the lattice is left untouched.
    pub fn set_constants(&mut self, a: f64, c: f64) -> Result<()> {
        let constants = LatticeConstants { a, c, ..self.constants };
        self.sites = generate_sites(&constants, self.orientation, self.view_extent)?;
        self.constants = constants;
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: f64) -> Result<()> {
        self.sites = generate_sites(&self.constants, orientation, self.view_extent)?;
        self.orientation = orientation;
        Ok(())
    }

    /// Back to the default sample at zero orientation.
    pub fn reset(&mut self) -> Result<()> {
        let constants = LatticeConstants::default();
        self.sites = generate_sites(&constants, 0.0, self.view_extent)?;
        self.constants = constants;
        self.orientation = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn contains(sites: &[Point2<f64>], p: &Point2<f64>) -> bool {
        sites
            .iter()
            .any(|s| (s.x - p.x).abs() < 1e-9 && (s.y - p.y).abs() < 1e-9)
    }

    // -----------------------------------------------------------------------
    // Site generation
    // -----------------------------------------------------------------------

    #[test]
    fn test_site_count_matches_grid() {
        let constants = LatticeConstants::default();
        let lattice = generate_sites(&constants, 0.3, VIEW_HALF_EXTENT).unwrap();
        // ceil(20/3.82) = 6, ceil(20/7.8) = 3
        assert_eq!(bounding_indices(&constants, VIEW_HALF_EXTENT).unwrap(), (6, 3));
        assert_eq!(lattice.len(), 4 * 7 * 4);
    }

    #[test]
    fn test_large_constants_still_give_four_sites() {
        let constants = LatticeConstants::new(40.0, 40.0, 40.0);
        let lattice = generate_sites(&constants, 1.0, VIEW_HALF_EXTENT).unwrap();
        assert!(lattice.len() >= 4, "got {} sites", lattice.len());
    }

    #[test]
    fn test_unrotated_sites_lie_on_grid() {
        let constants = LatticeConstants::new(5.0, 3.89, 8.0);
        let lattice = generate_sites(&constants, 0.0, VIEW_HALF_EXTENT).unwrap();
        for site in lattice.iter() {
            let fx = site.x / 5.0;
            let fy = site.y / 8.0;
            assert_abs_diff_eq!(fx, fx.round(), epsilon = 1e-9);
            assert_abs_diff_eq!(fy, fy.round(), epsilon = 1e-9);
        }
        assert!(contains(&lattice.sites, &Point2::new(-20.0, -24.0)));
    }

    #[test]
    fn test_sites_symmetric_under_negation() {
        let a_values = [2.0, 3.82, 7.5, 20.0];
        let c_values = [2.0, 7.8, 13.0];
        for &a in &a_values {
            for &c in &c_values {
                for k in 0..=12 {
                    let theta = k as f64 * FRAC_PI_2 / 12.0;
                    let constants = LatticeConstants::new(a, 3.89, c);
                    let lattice = generate_sites(&constants, theta, VIEW_HALF_EXTENT).unwrap();
                    for site in lattice.iter() {
                        let mirrored = Point2::new(-site.x, -site.y);
                        assert!(
                            contains(&lattice.sites, &mirrored),
                            "missing mirror of ({}, {}) for a={a}, c={c}, θ={theta}",
                            site.x,
                            site.y
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_orientation_wraps_modulo_two_pi() {
        let constants = LatticeConstants::default();
        let base = generate_sites(&constants, 0.4, VIEW_HALF_EXTENT).unwrap();
        let wrapped = generate_sites(&constants, 0.4 + 2.0 * TAU, VIEW_HALF_EXTENT).unwrap();
        let negative = generate_sites(&constants, 0.4 - TAU, VIEW_HALF_EXTENT).unwrap();
        assert_eq!(base.len(), wrapped.len());
        for (p, q) in base.iter().zip(wrapped.iter()).chain(base.iter().zip(negative.iter())) {
            assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(base.anchor.y, wrapped.anchor.y, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_constants_rejected() {
        let zero_a = LatticeConstants::new(0.0, 3.89, 7.8);
        assert_eq!(
            generate_sites(&zero_a, 0.0, VIEW_HALF_EXTENT),
            Err(XrdError::InvalidLatticeConstant { name: "a", value: 0.0 })
        );
        let negative_c = LatticeConstants::new(3.82, 3.89, -1.0);
        assert!(matches!(
            generate_sites(&negative_c, 0.0, VIEW_HALF_EXTENT),
            Err(XrdError::InvalidLatticeConstant { name: "c", .. })
        ));
        let nan_c = LatticeConstants::new(3.82, 3.89, f64::NAN);
        assert!(generate_sites(&nan_c, 0.0, VIEW_HALF_EXTENT).is_err());
    }

    #[test]
    fn test_tiny_constants_rejected_before_allocating() {
        for a in [1e-320, 1e-9] {
            let constants = LatticeConstants::new(a, 3.89, 7.8);
            assert_eq!(
                generate_sites(&constants, 0.0, VIEW_HALF_EXTENT),
                Err(XrdError::InvalidLatticeConstant { name: "a", value: a })
            );
        }
        let tiny_c = LatticeConstants::new(3.82, 3.89, 1e-6);
        assert!(matches!(
            bounding_indices(&tiny_c, VIEW_HALF_EXTENT),
            Err(XrdError::InvalidLatticeConstant { name: "c", .. })
        ));
        // Exactly MAX_GRID_INDEX rows is still allowed, one more is not.
        let unit = LatticeConstants::new(4.0, 3.89, 1.0);
        assert_eq!(bounding_indices(&unit, 10_000.0).unwrap(), (2500, MAX_GRID_INDEX));
        assert!(bounding_indices(&unit, 10_001.0).is_err());
    }

    // -----------------------------------------------------------------------
    // Anchor selection
    // -----------------------------------------------------------------------

    #[test]
    fn test_anchor_at_zero_orientation_is_top_of_centre_column() {
        let constants = LatticeConstants::default();
        let lattice = generate_sites(&constants, 0.0, VIEW_HALF_EXTENT).unwrap();
        // cos 0 = 1 > 1/√2, so the a branch sets the half spacing
        assert_abs_diff_eq!(lattice.top_row_spacing_half, constants.a / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lattice.anchor.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lattice.anchor.y, 3.0 * 7.8, epsilon = 1e-9);
    }

    #[test]
    fn test_anchor_at_right_angle_uses_a_rows() {
        let constants = LatticeConstants::default();
        let lattice = generate_sites(&constants, FRAC_PI_2, VIEW_HALF_EXTENT).unwrap();
        assert_abs_diff_eq!(lattice.top_row_spacing_half, constants.c / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lattice.anchor.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lattice.anchor.y, 6.0 * 3.82, epsilon = 1e-9);
    }

    #[test]
    fn test_anchor_is_highest_centre_site() {
        for k in 0..=24 {
            let theta = k as f64 * FRAC_PI_2 / 24.0;
            let lattice = generate_sites(&LatticeConstants::default(), theta, VIEW_HALF_EXTENT).unwrap();
            let anchor = lattice.anchor;
            assert!(contains(&lattice.sites, &anchor), "anchor not a site at θ={theta}");
            assert!(anchor.x.abs() <= lattice.top_row_spacing_half + 1e-9);
            assert!(anchor.y >= 0.0);
            let highest = lattice
                .iter()
                .filter(|s| s.x.abs() <= lattice.top_row_spacing_half + LATTICE_TOLERANCE)
                .map(|s| s.y)
                .fold(f64::NEG_INFINITY, f64::max);
            assert_abs_diff_eq!(anchor.y, highest, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_anchor_independent_of_site_order_near_45_degrees() {
        for &theta in &[FRAC_PI_4 - 1e-9, FRAC_PI_4, FRAC_PI_4 + 1e-9] {
            let constants = LatticeConstants::new(5.0, 5.0, 5.0);
            let lattice = generate_sites(&constants, theta, VIEW_HALF_EXTENT).unwrap();
            let mut reversed = lattice.sites.clone();
            reversed.reverse();
            let forward = select_anchor(&lattice.sites, lattice.top_row_spacing_half);
            let backward = select_anchor(&reversed, lattice.top_row_spacing_half);
            assert_abs_diff_eq!(forward.x, backward.x, epsilon = 1e-12);
            assert_abs_diff_eq!(forward.y, backward.y, epsilon = 1e-12);
        }
    }

    // -----------------------------------------------------------------------
    // Lattice facade
    // -----------------------------------------------------------------------

    #[test]
    fn test_set_constants_regenerates_sites() {
        let mut lattice = Lattice::new(LatticeConstants::default(), 0.0).unwrap();
        lattice.set_constants(5.0, 10.0).unwrap();
        assert_eq!(lattice.constants().a, 5.0);
        assert_eq!(lattice.constants().b, 3.89);
        assert_eq!(lattice.sites().len(), 4 * 5 * 3);
        assert_abs_diff_eq!(lattice.anchor().y, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_failed_update_leaves_lattice_untouched() {
        let mut lattice = Lattice::new(LatticeConstants::default(), 0.2).unwrap();
        let before = lattice.sites().clone();
        assert!(lattice.set_constants(-3.0, 7.8).is_err());
        assert_eq!(lattice.constants(), &LatticeConstants::default());
        assert_eq!(lattice.sites(), &before);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut lattice = Lattice::new(LatticeConstants::new(6.0, 6.0, 9.0), 1.1).unwrap();
        lattice.reset().unwrap();
        assert_eq!(lattice.constants(), &LatticeConstants::default());
        assert_eq!(lattice.orientation(), 0.0);
        assert_abs_diff_eq!(lattice.anchor().y, 3.0 * 7.8, epsilon = 1e-9);
    }

    #[test]
    fn test_reciprocal_basis() {
        let basis = LatticeConstants::new(2.0, 4.0, PI).reciprocal_basis();
        assert_abs_diff_eq!(basis[0], PI, epsilon = 1e-12);
        assert_abs_diff_eq!(basis[1], PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(basis[2], 2.0, epsilon = 1e-12);
    }
}
