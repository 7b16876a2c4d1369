use crate::error::ApiError;

/// Minimum text length for speech requests
const MIN_TEXT_LENGTH: usize = 1;

/// Validate speech request text
pub fn validate_speech_text(text: &str, max_length: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Input text cannot be empty".to_string()));
    }
    if text.len() > max_length {
        return Err(ApiError::InvalidInput(format!(
            "Input text too long (max {} characters)",
            max_length
        )));
    }
    if text.len() < MIN_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Input text too short (min {} characters)",
            MIN_TEXT_LENGTH
        )));
    }
    Ok(())
}

/// Validate requested container format; only WAV output is produced.
pub fn validate_response_format(format: &str) -> Result<(), ApiError> {
    if format.eq_ignore_ascii_case("wav") {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "Unsupported response_format: {}. Only 'wav' is supported",
            format
        )))
    }
}

/// Validate speed multiplier bounds before clamping
pub fn validate_speed(speed: f32) -> Result<(), ApiError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "Speed must be a positive number, got {}",
            speed
        )));
    }
    Ok(())
}
