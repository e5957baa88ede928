//! Nearby command implementation.

use crate::cli::NearbyArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use placetrust_sources::{NearbyPlace, PlacesClient};

/// Execute the nearby command, returning the places found.
pub fn execute_nearby(
    args: &NearbyArgs,
    client: &PlacesClient,
    formatter: &Formatter,
) -> Result<Vec<NearbyPlace>> {
    validate_coordinates(args.latitude, args.longitude)?;
    if args.radius == 0 {
        return Err(CliError::InvalidInput("Radius must be positive".to_string()));
    }

    let places = client.nearby(args.latitude, args.longitude, args.radius)?;
    println!("{}", formatter.format_nearby(&places)?);
    Ok(places)
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CliError::InvalidInput(
            "Latitude must be between -90 and 90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CliError::InvalidInput(
            "Longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(validate_coordinates(51.5, -0.12).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }
}
