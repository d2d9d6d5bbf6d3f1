use crate::fsrs::{D_MAX, D_MIN, INIT_S_MAX, S_MIN};

/// Lower and upper bound for each of the 21 parameters.
const PARAMETER_BOUNDS: [(f32, f32); 21] = [
    (S_MIN, INIT_S_MAX),
    (S_MIN, INIT_S_MAX),
    (S_MIN, INIT_S_MAX),
    (S_MIN, INIT_S_MAX),
    (D_MIN, D_MAX),
    (0.001, 4.0),
    (0.001, 4.0),
    (0.001, 0.75),
    (0.0, 4.5),
    (0.0, 0.8),
    (0.001, 3.5),
    (0.001, 5.0),
    (0.001, 0.25),
    (0.001, 0.9),
    (0.0, 4.0),
    (0.0, 1.0),
    (1.0, 6.0),
    (0.0, 2.0),
    (0.0, 2.0),
    (0.0, 0.8),
    (0.1, 0.8),
];

/// Clamps every parameter into the range the memory model stays well-behaved in.
pub(crate) fn clip_parameters(parameters: &[f32]) -> Vec<f32> {
    parameters
        .iter()
        .zip(PARAMETER_BOUNDS)
        .map(|(w, (low, high))| w.clamp(low, high))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsrs::DEFAULT_PARAMETERS;

    #[test]
    fn clip_parameters_works() {
        let mut parameters = DEFAULT_PARAMETERS.to_vec();
        parameters[..9].copy_from_slice(&[0.0, -1000.0, 1000.0, 0.0, 1000.0, -1000.0, 1.0, 0.25, -0.1]);

        let clipped = clip_parameters(&parameters);

        assert_eq!(
            &clipped[..9],
            &[0.001, 0.001, 100.0, 0.001, 10.0, 0.001, 1.0, 0.25, 0.0]
        );
    }

    #[test]
    fn default_parameters_survive_clipping() {
        let clipped = clip_parameters(&DEFAULT_PARAMETERS);
        assert_eq!(clipped, DEFAULT_PARAMETERS.to_vec());
    }

    #[test]
    fn short_term_parameters_are_capped() {
        let mut parameters = DEFAULT_PARAMETERS.to_vec();
        parameters[17] = 5.0;
        parameters[18] = -1.0;
        parameters[20] = 0.01;

        let clipped = clip_parameters(&parameters);

        assert_eq!(clipped.len(), 21);
        assert_eq!(clipped[17], 2.0);
        assert_eq!(clipped[18], 0.0);
        assert_eq!(clipped[20], 0.1);
    }
}
