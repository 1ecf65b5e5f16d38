#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
            46.21, 46.25, 45.71, 46.45, 45.78, 45.35, 44.03, 44.18, 44.22, 44.57,
        ]
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_ema_recurrence() {
        let data = vec![10.0, 20.0, 30.0];
        let result = ema(&data, 2);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 10.0).abs() < 0.01);
        assert!((result[1] - 16.67).abs() < 0.01);
        assert!((result[2] - 25.56).abs() < 0.01);
    }

    #[test]
    fn test_ema_empty_data() {
        let data: Vec<f64> = vec![];
        let result = ema(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let result = ema(&data, 3);

        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_rsi_basic() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert!(!result.is_empty());
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_short_series_is_empty() {
        for len in 0..14 {
            let data: Vec<f64> = (0..len).map(|i| 50.0 + if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
            assert!(rsi(&data, 14).is_empty(), "len {}", len);
        }
    }

    #[test]
    fn test_rsi_first_value_after_warmup() {
        let prices = sample_prices();
        let aligned = rsi_aligned(&prices, 14);

        assert_eq!(aligned.len(), prices.len());
        assert!(aligned[..14].iter().all(|v| v.is_none()));
        assert!(aligned[14].is_some());
    }

    #[test]
    fn test_rsi_drops_zero_loss_windows() {
        // No losing step anywhere: average loss is always zero, ratio undefined
        let uptrend: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert!(rsi(&uptrend, 14).is_empty());
    }

    #[test]
    fn test_rsi_drops_interior_zero_loss_windows() {
        // deltas: -1, +1, +1, +1, +1, -2, +3
        let prices = vec![10.0, 9.0, 10.0, 11.0, 12.0, 13.0, 11.0, 14.0];

        let aligned = rsi_aligned(&prices, 3);
        let defined: Vec<usize> = (0..aligned.len()).filter(|&i| aligned[i].is_some()).collect();
        // windows ending at 4 and 5 hold only gains
        assert_eq!(defined, vec![3, 6, 7]);

        let values = rsi(&prices, 3);
        assert_eq!(values.len(), 3);
        assert!((values[0] - 66.667).abs() < 0.01); // RS = (2/3) / (1/3)
        assert!((values[1] - 50.0).abs() < 0.01); // RS = (2/3) / (2/3)
        assert!((values[2] - 66.667).abs() < 0.01); // RS = (4/3) / (2/3)
    }

    #[test]
    fn test_rsi_matches_hand_computed_window() {
        // 14 deltas: seven +2 and seven -1 -> RS = 2, RSI = 66.67
        let mut data = vec![100.0];
        for i in 0..14 {
            let last = *data.last().unwrap();
            data.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let result = rsi(&data, 14);
        assert_eq!(result.len(), 1);
        assert!((result[0] - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_macd_basic() {
        let prices = sample_prices();
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd_line.len(), prices.len());
        assert_eq!(result.signal_line.len(), prices.len());
        assert_eq!(result.histogram.len(), prices.len());
    }

    #[test]
    fn test_macd_histogram() {
        let prices = sample_prices();
        let result = macd(&prices, 12, 26, 9);

        for (i, &hist) in result.histogram.iter().enumerate() {
            let expected = result.macd_line[i] - result.signal_line[i];
            assert!((hist - expected).abs() < 0.001);
        }
    }

    #[test]
    fn test_macd_uptrend_histogram_non_negative() {
        let data: Vec<f64> = (1..=120).map(|i| i as f64).collect();
        let result = macd(&data, 12, 26, 9);

        let tail = &result.histogram[60..];
        assert!(tail.iter().all(|&h| h >= -1e-9));
        assert!(*result.macd_line.last().unwrap() > 0.0);
    }

    #[test]
    fn test_bollinger_bands_basic() {
        let prices = sample_prices();
        let result = bollinger_bands(&prices, 20, 2.0);

        assert_eq!(result.upper.len(), prices.len() - 19);
        assert_eq!(result.upper.len(), result.middle.len());
        assert_eq!(result.middle.len(), result.lower.len());
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let prices = sample_prices();
        let result = bollinger_bands(&prices, 10, 2.0);

        for i in 0..result.upper.len() {
            assert!(result.lower[i] <= result.middle[i]);
            assert!(result.middle[i] <= result.upper[i]);
        }
    }

    #[test]
    fn test_bollinger_bands_constant_prices_collapse() {
        let prices = vec![100.0; 25];
        let result = bollinger_bands(&prices, 20, 2.0);

        for i in 0..result.upper.len() {
            assert!((result.upper[i] - result.lower[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        // window [1,2,3]: mean 2, sample std 1
        let result = bollinger_bands(&[1.0, 2.0, 3.0], 3, 2.0);
        assert_eq!(result.middle.len(), 1);
        assert!((result.upper[0] - 4.0).abs() < 1e-9);
        assert!((result.lower[0] - 0.0).abs() < 1e-9);
    }
}
