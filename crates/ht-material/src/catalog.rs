use crate::error::{MaterialError, MaterialResult};
use crate::material::MaterialModel;
use crate::property::PropertyModel;

const TABLE_TEMPS: [f64; 9] = [20.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0];

#[derive(Debug, Clone, Copy)]
struct GradeEntry {
    designation: &'static str,
    aliases: &'static [&'static str],
    conductivity: [f64; 9],
    specific_heat: [f64; 9],
    emissivity: Emissivity,
}

#[derive(Debug, Clone, Copy)]
enum Emissivity {
    Constant(f64),
    Oxidizing([f64; 6]),
}

const EMISSIVITY_TEMPS: [f64; 6] = [20.0, 200.0, 400.0, 600.0, 800.0, 1000.0];

const GRADES: [GradeEntry; 3] = [
    GradeEntry {
        designation: "S355J2G3",
        aliases: &["s355", "s355j2"],
        conductivity: [53.0, 51.0, 49.0, 46.0, 42.0, 38.0, 33.0, 28.0, 26.0],
        specific_heat: [450.0, 480.0, 510.0, 540.0, 580.0, 620.0, 700.0, 780.0, 650.0],
        emissivity: Emissivity::Oxidizing([0.25, 0.35, 0.50, 0.70, 0.85, 0.90]),
    },
    GradeEntry {
        designation: "AISI 4130",
        aliases: &["4130", "25crmo4"],
        conductivity: [42.7, 42.3, 40.5, 38.3, 35.7, 32.8, 29.7, 26.5, 25.8],
        specific_heat: [477.0, 502.0, 532.0, 565.0, 602.0, 644.0, 710.0, 790.0, 660.0],
        emissivity: Emissivity::Constant(0.87),
    },
    GradeEntry {
        designation: "AISI 4340",
        aliases: &["4340", "34crnimo6"],
        conductivity: [44.5, 44.0, 42.5, 40.2, 37.5, 34.5, 31.0, 27.5, 26.0],
        specific_heat: [475.0, 500.0, 530.0, 560.0, 600.0, 640.0, 700.0, 780.0, 650.0],
        emissivity: Emissivity::Oxidizing([0.28, 0.38, 0.52, 0.72, 0.87, 0.92]),
    },
];

impl GradeEntry {
    fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_ascii_lowercase();
        self.designation.to_ascii_lowercase() == q || self.aliases.iter().any(|a| *a == q)
    }

    fn to_model(self) -> MaterialModel {
        MaterialModel {
            grade: self.designation.to_string(),
            conductivity: PropertyModel::curve(TABLE_TEMPS.to_vec(), self.conductivity.to_vec()),
            specific_heat: PropertyModel::curve(TABLE_TEMPS.to_vec(), self.specific_heat.to_vec()),
            density: PropertyModel::constant(7850.0),
            emissivity: match self.emissivity {
                Emissivity::Constant(v) => PropertyModel::constant(v),
                Emissivity::Oxidizing(values) => {
                    PropertyModel::curve(EMISSIVITY_TEMPS.to_vec(), values.to_vec())
                }
            },
        }
    }
}

/// Every built-in grade.
pub fn standard_grades() -> Vec<MaterialModel> {
    GRADES.iter().map(|g| g.to_model()).collect()
}

/// Look up a grade by designation or alias, case-insensitively.
pub fn grade(name: &str) -> MaterialResult<MaterialModel> {
    GRADES
        .iter()
        .find(|g| g.matches(name))
        .map(|g| g.to_model())
        .ok_or_else(|| MaterialError::UnknownGrade {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::OperatingRange;

    #[test]
    fn all_grades_are_physical() {
        for mat in standard_grades() {
            mat.validate(OperatingRange::default())
                .unwrap_or_else(|e| panic!("{}: {e}", mat.grade));
        }
    }

    #[test]
    fn lookup_by_alias() {
        assert!(grade("4140").is_err());
        assert_eq!(grade(" AISI 4340 ").unwrap().grade, "AISI 4340");
        assert_eq!(grade("s355").unwrap().grade, "S355J2G3");
    }
}
