use crate::ModisError;
use num_traits::Zero;

/// A row-major grid of samples with a per-pixel validity mask.
///
/// Row 0 is the northern edge of the grid. Masked pixels always hold
/// `T::zero()`, so two rasters compare equal when they agree on which
/// pixels are valid and on the values of those pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    /// Number of (columns, rows) in this raster.
    dimensions: (usize, usize),

    /// Samples; zero where masked.
    values: Box<[T]>,

    /// `true` where the corresponding sample holds a value.
    valid: Box<[bool]>,
}

impl<T> Raster<T>
where
    T: Copy + Zero,
{
    /// Returns a fully valid raster over `values`.
    pub fn new(dimensions: (usize, usize), values: Vec<T>) -> Result<Self, ModisError> {
        let valid = vec![true; values.len()];
        Self::from_parts(dimensions, values, valid)
    }

    /// Returns a raster from samples and their validity.
    pub fn from_parts(
        dimensions: (usize, usize),
        mut values: Vec<T>,
        valid: Vec<bool>,
    ) -> Result<Self, ModisError> {
        let expected = dimensions
            .0
            .checked_mul(dimensions.1)
            .ok_or(ModisError::TooLarge(dimensions))?;
        for actual in [values.len(), valid.len()] {
            if actual != expected {
                return Err(ModisError::SampleCount { expected, actual });
            }
        }
        for (value, _) in values.iter_mut().zip(&valid).filter(|(_, ok)| !**ok) {
            *value = T::zero();
        }
        Ok(Self {
            dimensions,
            values: values.into_boxed_slice(),
            valid: valid.into_boxed_slice(),
        })
    }

    /// Returns a raster built by evaluating `f` at every linear
    /// index. `None` masks the pixel.
    pub fn from_fn<F>(dimensions: (usize, usize), mut f: F) -> Self
    where
        F: FnMut(usize) -> Option<T>,
    {
        let len = dimensions.0 * dimensions.1;
        let mut values = Vec::with_capacity(len);
        let mut valid = Vec::with_capacity(len);
        for index in 0..len {
            match f(index) {
                Some(value) => {
                    values.push(value);
                    valid.push(true);
                }
                None => {
                    values.push(T::zero());
                    valid.push(false);
                }
            }
        }
        Self {
            dimensions,
            values: values.into_boxed_slice(),
            valid: valid.into_boxed_slice(),
        }
    }

    /// Returns a fully valid raster where every pixel is `value`.
    pub fn constant(dimensions: (usize, usize), value: T) -> Self {
        Self::from_fn(dimensions, |_| Some(value))
    }

    /// Returns an all-zero raster with no valid pixels.
    pub fn masked(dimensions: (usize, usize)) -> Self {
        Self::from_fn(dimensions, |_| None)
    }

    /// Number of (columns, rows) in this raster.
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    /// Returns the number of pixels in this raster.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the sample at linear `index`, or `None` if it is
    /// masked or out of bounds.
    pub fn get(&self, index: usize) -> Option<T> {
        match self.valid.get(index) {
            Some(true) => Some(self.values[index]),
            _ => None,
        }
    }

    /// Returns the sample at column `x` and row `y`.
    pub fn get_xy(&self, (x, y): (usize, usize)) -> Option<T> {
        let (cols, rows) = self.dimensions;
        if x < cols && y < rows {
            self.get(y * cols + x)
        } else {
            None
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }

    /// Returns the number of unmasked pixels.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|ok| **ok).count()
    }

    pub fn is_fully_masked(&self) -> bool {
        self.valid.iter().all(|ok| !ok)
    }

    /// Returns an iterator over every pixel, `None` where masked.
    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + '_ {
        self.values
            .iter()
            .zip(self.valid.iter())
            .map(|(value, ok)| ok.then_some(*value))
    }

    /// Masks every pixel for which `keep` returns false.
    ///
    /// Pixels which are already masked stay masked.
    pub fn update_mask<F>(&mut self, keep: F)
    where
        F: Fn(usize) -> bool,
    {
        for (index, (value, ok)) in self
            .values
            .iter_mut()
            .zip(self.valid.iter_mut())
            .enumerate()
        {
            if *ok && !keep(index) {
                *ok = false;
                *value = T::zero();
            }
        }
    }

    /// Masks every pixel that is masked in `other`.
    pub fn mask_with<U>(&mut self, other: &Raster<U>) -> Result<(), ModisError>
    where
        U: Copy + Zero,
    {
        self.check_dimensions(other.dimensions)?;
        self.update_mask(|index| other.valid[index]);
        Ok(())
    }

    /// Returns a raster of `f` applied to every valid pixel.
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: Copy + Zero,
        F: Fn(T) -> U,
    {
        Raster::from_fn(self.dimensions, |index| self.get(index).map(&f))
    }

    /// Copies every valid pixel of `top` over `self`.
    pub fn overlay(&mut self, top: &Raster<T>) -> Result<(), ModisError> {
        self.check_dimensions(top.dimensions)?;
        for (index, ok) in top.valid.iter().enumerate() {
            if *ok {
                self.values[index] = top.values[index];
                self.valid[index] = true;
            }
        }
        Ok(())
    }

    /// Fails unless `actual` matches this raster's dimensions.
    pub fn check_dimensions(&self, actual: (usize, usize)) -> Result<(), ModisError> {
        if self.dimensions == actual {
            Ok(())
        } else {
            Err(ModisError::Dimensions {
                expected: self.dimensions,
                actual,
            })
        }
    }
}
