use crate::Matrix;

use serde::ser::SerializeStruct;
use serde::Deserialize;

impl serde::Serialize for Matrix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Matrix", 3)?;
        state.serialize_field("rows", &self.rows())?;
        state.serialize_field("columns", &self.columns())?;
        state.serialize_field("data", self.as_slice())?;
        state.end()
    }
}

impl<'de> serde::Deserialize<'de> for Matrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct MatrixData {
            rows: usize,
            columns: usize,
            data: Vec<f32>,
        }

        let MatrixData {
            rows,
            columns,
            data,
        } = MatrixData::deserialize(deserializer)?;

        Matrix::from_shape_vec([rows, columns], data).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let m = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let serialized = serde_json::to_string(&m)?;
        let deserialized: Matrix = serde_json::from_str(&serialized)?;
        assert_eq!(m, deserialized);
        Ok(())
    }

    #[test]
    fn test_serde_rejects_bad_length() {
        let res: Result<Matrix, _> = serde_json::from_str(r#"{"rows":2,"columns":2,"data":[1.0]}"#);
        assert!(res.is_err());
    }
}
