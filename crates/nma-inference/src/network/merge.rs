//! Block-diagonal merge of per-component fits.

use nalgebra::DMatrix;

use super::contrast::Contrast;

/// Fit of one connected component, indexed by its own treatment order.
#[derive(Debug, Clone)]
pub(crate) struct ComponentResult<T, S> {
    pub treatments: Vec<T>,
    pub effects: DMatrix<f64>,
    pub se: DMatrix<f64>,
    pub contrasts: Vec<Contrast<T, S>>,
    pub q: f64,
    pub df: f64,
    pub tau: f64,
}

/// All components in one coordinate system.
#[derive(Debug, Clone)]
pub(crate) struct MergedNetwork<T, S> {
    pub treatments: Vec<T>,
    pub effects: DMatrix<f64>,
    pub se: DMatrix<f64>,
    pub contrasts: Vec<Contrast<T, S>>,
    pub components: Vec<Vec<T>>,
    pub tau: Vec<f64>,
    pub q: f64,
    pub df: f64,
}

/// Concatenate treatments, contrasts, Q and df; embed each component's
/// matrices on the diagonal. Cells between components have no evidence and
/// are NaN.
pub(crate) fn merge_components<T: Clone, S>(parts: Vec<ComponentResult<T, S>>) -> MergedNetwork<T, S> {
    let n: usize = parts.iter().map(|p| p.treatments.len()).sum();
    let mut merged = MergedNetwork {
        treatments: Vec::with_capacity(n),
        effects: DMatrix::from_element(n, n, f64::NAN),
        se: DMatrix::from_element(n, n, f64::NAN),
        contrasts: Vec::new(),
        components: Vec::with_capacity(parts.len()),
        tau: Vec::with_capacity(parts.len()),
        q: 0.0,
        df: 0.0,
    };

    let mut offset = 0;
    for part in parts {
        let size = part.treatments.len();
        merged.effects.view_mut((offset, offset), (size, size)).copy_from(&part.effects);
        merged.se.view_mut((offset, offset), (size, size)).copy_from(&part.se);
        merged.components.push(part.treatments.clone());
        merged.treatments.extend(part.treatments);
        merged.contrasts.extend(part.contrasts);
        merged.tau.push(part.tau);
        merged.q += part.q;
        merged.df += part.df;
        offset += size;
    }
    merged
}
