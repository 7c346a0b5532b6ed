//! Stoichiometric matrix of a reaction network.
//!
//! The matrix holds metabolites in rows and reactions in columns. Negative entries
//! are substrate coefficients, positive entries product coefficients. Metabolite
//! and reaction identifiers are resolved to indices once, when the matrix is
//! built, so that all downstream computations work on plain integer indices.

use std::collections::HashMap;

use itertools::Itertools;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::error::NetworkError;

/// Role a metabolite plays at the boundary of the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaboliteRole {
    /// Initial substrate, supplied by an `<id>_in` exchange reaction
    Input,
    /// Final product, drained by an `<id>_out` exchange reaction
    Output,
    /// Intermediate metabolite
    Inner,
}

/// Classification of a reaction by the sign pattern of its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionKind {
    /// No substrates: external source
    Input,
    /// No products: external sink
    Output,
    /// Regular enzymatic reaction
    Inner,
}

impl ReactionKind {
    pub fn is_pseudo(&self) -> bool {
        !matches!(self, ReactionKind::Inner)
    }
}

/// A reaction written as lists of `(metabolite, coefficient)` pairs.
///
/// Coefficients are positive on both sides; the sign is applied when the
/// matrix is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEquation {
    pub id: String,
    pub substrates: Vec<(String, f64)>,
    pub products: Vec<(String, f64)>,
}

impl ReactionEquation {
    pub fn new(
        id: impl Into<String>,
        substrates: &[(&str, f64)],
        products: &[(&str, f64)],
    ) -> Self {
        Self {
            id: id.into(),
            substrates: substrates
                .iter()
                .map(|(m, c)| (m.to_string(), *c))
                .collect(),
            products: products.iter().map(|(m, c)| (m.to_string(), *c)).collect(),
        }
    }
}

/// Metabolites taking part in one reaction, as row indices and absolute coefficients
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionParticipation {
    pub substrates: Vec<(usize, f64)>,
    pub products: Vec<(usize, f64)>,
}

/// Concentration operands of one reaction's rate law.
///
/// A substrate index of `None` is the unit placeholder standing in for the
/// external source of an input pseudo-reaction; its concentration is always 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLawOperands {
    pub substrates: Vec<(Option<usize>, f64)>,
    pub products: Vec<(usize, f64)>,
}

impl RateLawOperands {
    pub fn substrate_coefficients(&self) -> Vec<f64> {
        self.substrates.iter().map(|(_, c)| *c).collect()
    }

    pub fn product_coefficients(&self) -> Vec<f64> {
        self.products.iter().map(|(_, c)| *c).collect()
    }

    /// Gathers substrate concentrations from a full metabolite vector
    pub fn substrate_concentrations(&self, concentrations: &[f64]) -> Vec<f64> {
        self.substrates
            .iter()
            .map(|(i, _)| i.map_or(1.0, |i| concentrations[i]))
            .collect()
    }

    /// Gathers product concentrations from a full metabolite vector
    pub fn product_concentrations(&self, concentrations: &[f64]) -> Vec<f64> {
        self.products.iter().map(|(i, _)| concentrations[*i]).collect()
    }
}

/// Immutable stoichiometric matrix with identifier lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoichiometryData", into = "StoichiometryData")]
pub struct StoichiometricMatrix {
    metabolites: Vec<String>,
    reactions: Vec<String>,
    matrix: DMatrix<f64>,
    balanced: Vec<bool>,
    metabolite_index: HashMap<String, usize>,
    reaction_index: HashMap<String, usize>,
}

impl StoichiometricMatrix {
    /// Creates a stoichiometric matrix from identifiers and a dense matrix.
    ///
    /// All metabolites are subject to mass balance; use
    /// [`StoichiometricMatrix::exclude_from_balance`] to hold some of them fixed.
    ///
    /// # Arguments
    ///
    /// * `metabolites` - Row identifiers
    /// * `reactions` - Column identifiers
    /// * `matrix` - Signed coefficients, metabolites × reactions
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] if the matrix is empty, the identifier lists do
    /// not match its shape, an identifier is duplicated, an entry is not finite
    /// or a reaction column is entirely zero.
    pub fn new(
        metabolites: Vec<String>,
        reactions: Vec<String>,
        matrix: DMatrix<f64>,
    ) -> Result<Self, NetworkError> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(NetworkError::EmptyMatrix);
        }
        if metabolites.len() != matrix.nrows() {
            return Err(NetworkError::DimensionMismatch {
                what: "metabolites".to_string(),
                expected: matrix.nrows(),
                found: metabolites.len(),
            });
        }
        if reactions.len() != matrix.ncols() {
            return Err(NetworkError::DimensionMismatch {
                what: "reactions".to_string(),
                expected: matrix.ncols(),
                found: reactions.len(),
            });
        }

        let metabolite_index = index_ids(&metabolites)?;
        let reaction_index = index_ids(&reactions)?;

        for (j, reaction) in reactions.iter().enumerate() {
            for (i, metabolite) in metabolites.iter().enumerate() {
                if !matrix[(i, j)].is_finite() {
                    return Err(NetworkError::NonFiniteCoefficient {
                        metabolite: metabolite.clone(),
                        reaction: reaction.clone(),
                    });
                }
            }
            if matrix.column(j).iter().all(|&c| c == 0.0) {
                return Err(NetworkError::EmptyReaction(reaction.clone()));
            }
        }

        let balanced = vec![true; metabolites.len()];

        Ok(Self {
            metabolites,
            reactions,
            matrix,
            balanced,
            metabolite_index,
            reaction_index,
        })
    }

    /// Derives the stoichiometric matrix from a list of reaction equations.
    ///
    /// Metabolites are sorted by identifier for consistent row indexing; reaction
    /// columns keep the order of `equations`.
    pub fn from_reactions(equations: &[ReactionEquation]) -> Result<Self, NetworkError> {
        if equations.is_empty() {
            return Err(NetworkError::EmptyMatrix);
        }

        let species: Vec<String> = equations
            .iter()
            .flat_map(|eq| eq.substrates.iter().chain(eq.products.iter()))
            .map(|(m, _)| m.clone())
            .unique()
            .sorted_unstable()
            .collect();

        let species_indices: HashMap<&String, usize> =
            species.iter().enumerate().map(|(i, s)| (s, i)).collect();

        let mut matrix = DMatrix::zeros(species.len(), equations.len());
        for (j, eq) in equations.iter().enumerate() {
            for (metabolite, coefficient) in &eq.substrates {
                matrix[(species_indices[metabolite], j)] -= coefficient.abs();
            }
            for (metabolite, coefficient) in &eq.products {
                matrix[(species_indices[metabolite], j)] += coefficient.abs();
            }
        }

        let reactions = equations.iter().map(|eq| eq.id.clone()).collect();
        Self::new(species, reactions, matrix)
    }

    /// Returns a copy in which the given metabolites are excluded from mass balance.
    ///
    /// Unbalanced metabolites are held at their reference concentration during
    /// continuation and are not part of the system Jacobian.
    pub fn exclude_from_balance(&self, metabolites: &[&str]) -> Result<Self, NetworkError> {
        let mut excluded = self.clone();
        for id in metabolites {
            let i = self
                .metabolite_index(id)
                .ok_or_else(|| NetworkError::UnknownMetabolite(id.to_string()))?;
            excluded.balanced[i] = false;
        }
        Ok(excluded)
    }

    pub fn n_metabolites(&self) -> usize {
        self.metabolites.len()
    }

    pub fn n_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn metabolites(&self) -> &[String] {
        &self.metabolites
    }

    pub fn reactions(&self) -> &[String] {
        &self.reactions
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn metabolite_index(&self, id: &str) -> Option<usize> {
        self.metabolite_index.get(id).copied()
    }

    pub fn reaction_index(&self, id: &str) -> Option<usize> {
        self.reaction_index.get(id).copied()
    }

    pub fn is_balanced(&self, metabolite: usize) -> bool {
        self.balanced[metabolite]
    }

    /// Row indices of the metabolites subject to mass balance, in row order
    pub fn balanced_indices(&self) -> Vec<usize> {
        (0..self.n_metabolites())
            .filter(|&i| self.balanced[i])
            .collect()
    }

    /// The rows of the matrix belonging to balanced metabolites
    pub fn balance_view(&self) -> DMatrix<f64> {
        self.matrix.select_rows(self.balanced_indices().iter())
    }

    /// Substrates and products of reaction `j`, read from the sign pattern.
    pub fn participation(&self, j: usize) -> ReactionParticipation {
        let mut participation = ReactionParticipation::default();
        for (i, &c) in self.matrix.column(j).iter().enumerate() {
            if c < 0.0 {
                participation.substrates.push((i, -c));
            } else if c > 0.0 {
                participation.products.push((i, c));
            }
        }
        participation
    }

    /// Rate-law operands of reaction `j`.
    ///
    /// Input pseudo-reactions get a single unit substrate with coefficient 1.
    pub fn rate_law_operands(&self, j: usize) -> RateLawOperands {
        let participation = self.participation(j);
        let substrates = if participation.substrates.is_empty() {
            vec![(None, 1.0)]
        } else {
            participation
                .substrates
                .into_iter()
                .map(|(i, c)| (Some(i), c))
                .collect()
        };

        RateLawOperands {
            substrates,
            products: participation.products,
        }
    }

    pub fn reaction_kind(&self, j: usize) -> ReactionKind {
        let column = self.matrix.column(j);
        if column.iter().all(|&c| c >= 0.0) {
            ReactionKind::Input
        } else if column.iter().all(|&c| c <= 0.0) {
            ReactionKind::Output
        } else {
            ReactionKind::Inner
        }
    }

    /// Indices of the regular enzymatic reactions
    pub fn inner_reactions(&self) -> Vec<usize> {
        (0..self.n_reactions())
            .filter(|&j| self.reaction_kind(j) == ReactionKind::Inner)
            .collect()
    }

    /// Classifies metabolites as network inputs, outputs or intermediates.
    ///
    /// A metabolite that is never produced is an input and one that is never
    /// consumed is an output. Cyclic pathways have no such metabolites, so the
    /// explicit `inputs` and `outputs` override the detected roles.
    pub fn classify_metabolites(
        &self,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<Vec<MetaboliteRole>, NetworkError> {
        let mut roles: Vec<MetaboliteRole> = self
            .matrix
            .row_iter()
            .map(|row| {
                if row.iter().all(|&c| c >= 0.0) {
                    MetaboliteRole::Output
                } else if row.iter().all(|&c| c <= 0.0) {
                    MetaboliteRole::Input
                } else {
                    MetaboliteRole::Inner
                }
            })
            .collect();

        for (ids, role) in [(inputs, MetaboliteRole::Input), (outputs, MetaboliteRole::Output)] {
            for id in ids {
                let i = self
                    .metabolite_index(id)
                    .ok_or_else(|| NetworkError::UnknownMetabolite(id.to_string()))?;
                roles[i] = role;
            }
        }

        Ok(roles)
    }

    /// Appends exchange reactions for every input and output metabolite.
    ///
    /// Inputs receive a `<id>_in` column (∅ → id) and outputs a `<id>_out`
    /// column (id → ∅). Balance flags are preserved.
    pub fn with_exchange_reactions(&self, roles: &[MetaboliteRole]) -> Result<Self, NetworkError> {
        if roles.len() != self.n_metabolites() {
            return Err(NetworkError::DimensionMismatch {
                what: "metabolite roles".to_string(),
                expected: self.n_metabolites(),
                found: roles.len(),
            });
        }

        let mut columns: Vec<(String, usize, f64)> = Vec::new();
        for (role, sign, suffix) in [
            (MetaboliteRole::Input, 1.0, "_in"),
            (MetaboliteRole::Output, -1.0, "_out"),
        ] {
            for (i, metabolite) in self.metabolites.iter().enumerate() {
                if roles[i] == role {
                    columns.push((format!("{metabolite}{suffix}"), i, sign));
                }
            }
        }

        let n_old = self.n_reactions();
        let mut matrix = self
            .matrix
            .clone()
            .resize_horizontally(n_old + columns.len(), 0.0);
        let mut reactions = self.reactions.clone();
        for (k, (id, i, sign)) in columns.into_iter().enumerate() {
            matrix[(i, n_old + k)] = sign;
            reactions.push(id);
        }

        let mut full = Self::new(self.metabolites.clone(), reactions, matrix)?;
        full.balanced = self.balanced.clone();
        Ok(full)
    }
}

fn index_ids(ids: &[String]) -> Result<HashMap<String, usize>, NetworkError> {
    let mut index = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if index.insert(id.clone(), i).is_some() {
            return Err(NetworkError::DuplicateId(id.clone()));
        }
    }
    Ok(index)
}

/// Serialized form of a [`StoichiometricMatrix`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoichiometryData {
    metabolites: Vec<String>,
    reactions: Vec<String>,
    /// Row-major coefficients, one row per metabolite
    coefficients: Vec<Vec<f64>>,
    #[serde(default)]
    unbalanced: Vec<String>,
}

impl TryFrom<StoichiometryData> for StoichiometricMatrix {
    type Error = NetworkError;

    fn try_from(data: StoichiometryData) -> Result<Self, Self::Error> {
        let n_cols = data.reactions.len();
        for row in &data.coefficients {
            if row.len() != n_cols {
                return Err(NetworkError::DimensionMismatch {
                    what: "coefficient row".to_string(),
                    expected: n_cols,
                    found: row.len(),
                });
            }
        }
        let matrix = DMatrix::from_row_iterator(
            data.coefficients.len(),
            n_cols,
            data.coefficients.iter().flatten().copied(),
        );
        let unbalanced: Vec<&str> = data.unbalanced.iter().map(String::as_str).collect();
        Self::new(data.metabolites, data.reactions, matrix)?.exclude_from_balance(&unbalanced)
    }
}

impl From<StoichiometricMatrix> for StoichiometryData {
    fn from(stoich: StoichiometricMatrix) -> Self {
        let coefficients = stoich
            .matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        let unbalanced = stoich
            .metabolites
            .iter()
            .zip(stoich.balanced.iter())
            .filter(|(_, &balanced)| !balanced)
            .map(|(m, _)| m.clone())
            .collect();

        Self {
            metabolites: stoich.metabolites,
            reactions: stoich.reactions,
            coefficients,
            unbalanced,
        }
    }
}
