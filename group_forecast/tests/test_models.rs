mod common;

use approx::assert_abs_diff_eq;
use common::{calendar_frame, sales_frame, units, SERIES};
use group_forecast::data::{CalendarTable, SalesTable};
use group_forecast::metrics::table_accuracy;
use group_forecast::models::{
    ExponentialSmoothingTrainer, LinearWindowTrainer, MovingAverageTrainer, Trainer, TrainerKind,
};
use group_forecast::preprocessing::{WindowBuilder, WindowConfig, WindowedDataset};
use group_forecast::records::RecordTable;
use group_forecast::{GroupKey, PipelineError, Result};
use rstest::rstest;
use std::sync::Arc;

fn dataset(units: impl Fn(usize, usize) -> f64) -> WindowedDataset {
    let calendar = CalendarTable::from_dataframe(calendar_frame(70)).unwrap();
    let config = WindowConfig {
        n_training: 14,
        n_forecast: 7,
        strict_calendar: false,
    };
    let sales = SalesTable::from_dataframe(sales_frame(&SERIES[..3], 70, units)).unwrap();
    WindowBuilder::new(Arc::new(calendar), config)
        .unwrap()
        .build(&GroupKey::new(["test"]), &sales)
        .unwrap()
}

#[rstest]
#[case(TrainerKind::Linear)]
#[case(TrainerKind::MovingAverage)]
#[case(TrainerKind::ExponentialSmoothing)]
fn test_trainers_cover_every_series_and_day(#[case] kind: TrainerKind) {
    let data = dataset(units);
    let trainer = kind.build();

    let predictions = trainer.train(&GroupKey::new(["test"]), &data, 20).unwrap();

    data.check_predictions(&predictions).unwrap();
    assert_eq!(predictions.len(), 3);
    for day in data.valid_day_columns() {
        assert!(predictions
            .numeric_column(day)
            .iter()
            .all(|v| v.map_or(false, f64::is_finite)));
    }
    assert_eq!(predictions.records()[2]["item_id"], "HOBBIES_1_001");
}

#[rstest]
#[case(TrainerKind::MovingAverage)]
#[case(TrainerKind::ExponentialSmoothing)]
#[case(TrainerKind::Linear)]
fn test_constant_sales_are_predicted_exactly(#[case] kind: TrainerKind) {
    let data = dataset(|_, _| 4.0);
    let predictions = kind.build().train(&GroupKey::new(["test"]), &data, 5).unwrap();

    for day in data.valid_day_columns() {
        for value in predictions.numeric_column(day) {
            assert_abs_diff_eq!(value.unwrap(), 4.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_linear_trainer_beats_a_flat_guess() {
    let data = dataset(units);
    let predictions = LinearWindowTrainer::default()
        .train(&GroupKey::new(["test"]), &data, 200)
        .unwrap();
    let accuracy = table_accuracy(data.validation_table(), &predictions, data.valid_day_columns()).unwrap();

    // predicting zero everywhere has an MAE equal to the mean of the actuals
    let actuals: Vec<f64> = data
        .valid_day_columns()
        .iter()
        .flat_map(|d| data.validation_table().numeric_column(d))
        .flatten()
        .collect();
    let flat_mae = actuals.iter().sum::<f64>() / actuals.len() as f64;
    assert!(accuracy.mae < flat_mae);
}

#[test]
fn test_linear_trainer_needs_epochs() {
    let data = dataset(units);
    assert!(matches!(
        LinearWindowTrainer::default().train(&GroupKey::new(["test"]), &data, 0),
        Err(PipelineError::ConfigError(_))
    ));
}

#[test]
fn test_linear_trainer_refuses_oversized_groups() {
    let data = dataset(units);
    // 14 steps x (3 series + 5 calendar features) inputs, 3 outputs
    let coefficients = 14 * 8 * 3;

    let result = LinearWindowTrainer::default()
        .with_max_coefficients(coefficients - 1)
        .train(&GroupKey::new(["test"]), &data, 5);
    match result {
        Err(PipelineError::TrainingError(msg)) => assert!(msg.contains("exceeds")),
        other => panic!("expected a training error, got {:?}", other.map(|t| t.len())),
    }

    let predictions = LinearWindowTrainer::default()
        .with_max_coefficients(coefficients)
        .train(&GroupKey::new(["test"]), &data, 5)
        .unwrap();
    data.check_predictions(&predictions).unwrap();
}

#[test]
fn test_trainer_parameters_are_checked() {
    assert!(MovingAverageTrainer::new(0).is_err());
    assert!(ExponentialSmoothingTrainer::new(0.0).is_err());
    assert!(ExponentialSmoothingTrainer::new(1.5).is_err());
    assert!(LinearWindowTrainer::default().with_learning_rate(-1.0).is_err());
    assert!(LinearWindowTrainer::default().with_batch_size(0).is_err());
}

#[test]
fn test_moving_average_window_longer_than_history() {
    let data = dataset(units);
    let trainer = MovingAverageTrainer::new(100).unwrap();
    let predictions = trainer.train(&GroupKey::new(["test"]), &data, 1).unwrap();
    data.check_predictions(&predictions).unwrap();
}

#[test]
fn test_closure_trainer() {
    let data = dataset(units);
    let echo = |_key: &GroupKey, dataset: &WindowedDataset, _epochs: usize| -> Result<RecordTable> {
        dataset.prediction_table(dataset.y_valid.view())
    };
    let trainer: Arc<dyn Trainer> = Arc::new(echo);

    let predictions = trainer.train(&GroupKey::new(["test"]), &data, 1).unwrap();
    let accuracy = table_accuracy(data.validation_table(), &predictions, data.valid_day_columns()).unwrap();
    assert_abs_diff_eq!(accuracy.mae, 0.0, epsilon = 1e-9);
    assert_eq!(trainer.name(), "custom");
}

#[test]
fn test_trainer_names() {
    assert_eq!(TrainerKind::MovingAverage.build().name(), "Simple Moving Average (window=7)");
    assert_eq!(MovingAverageTrainer::new(3).unwrap().name(), "Simple Moving Average (window=3)");
    assert!(TrainerKind::Linear.build().name().contains("Linear"));
}
