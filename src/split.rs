//! Воспроизводимое разбиение на обучающую и тестовую выборки

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Перемешивает индексы с фиксированным seed; первые `ceil(n * test_size)`
/// уходят в тест, остальные в обучение.
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::Config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(Error::EmptyData(format!(
            "cannot split {} samples with test_size {}",
            n_samples, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(Split {
        train,
        test: indices,
    })
}

/// Последовательные блоки для k-fold; первые `n % k` блоков на один больше
pub fn k_fold(n_samples: usize, folds: usize) -> Result<Vec<Split>> {
    if folds < 2 {
        return Err(Error::Config(format!("need at least 2 folds, got {}", folds)));
    }
    if n_samples < folds {
        return Err(Error::EmptyData(format!(
            "cannot make {} folds from {} samples",
            folds, n_samples
        )));
    }

    let base = n_samples / folds;
    let extra = n_samples % folds;

    let mut splits = Vec::with_capacity(folds);
    let mut start = 0;
    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        splits.push(Split {
            train: (0..start).chain(end..n_samples).collect(),
            test: (start..end).collect(),
        });
        start = end;
    }
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_seed_same_partition() {
        let a = train_test_split(100, 0.2, 42).unwrap();
        let b = train_test_split(100, 0.2, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.test.len(), 20);
        assert_eq!(a.train.len(), 80);

        let c = train_test_split(100, 0.2, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let split = train_test_split(37, 0.25, 1).unwrap();
        // ceil(37 * 0.25) = 10
        assert_eq!(split.test.len(), 10);

        let train: HashSet<_> = split.train.iter().copied().collect();
        let test: HashSet<_> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 37);
    }

    #[test]
    fn rejects_degenerate_splits() {
        assert!(train_test_split(10, 0.0, 1).is_err());
        assert!(train_test_split(10, 1.0, 1).is_err());
        assert!(train_test_split(1, 0.5, 1).is_err());
        assert!(train_test_split(0, 0.2, 1).is_err());
    }

    #[test]
    fn k_fold_covers_every_row_once() {
        let folds = k_fold(11, 3).unwrap();
        let sizes: Vec<_> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
        assert_eq!(folds[1].test, vec![4, 5, 6, 7]);
        assert_eq!(folds[1].train.len(), 7);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..11).collect::<Vec<_>>());

        assert!(k_fold(2, 3).is_err());
        assert!(k_fold(10, 1).is_err());
    }
}
