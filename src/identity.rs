//! Identity directory: maps authenticated users to student and lecturer profiles
use super::error::StoreError;
use serde::{Deserialize, Serialize};
use sled::Transactional;

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode,
)]
pub struct Student {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub student_number: String,
    #[n(3)]
    #[serde(default)]
    pub program_study: String,
    #[n(4)]
    #[serde(default)]
    pub academic_year: String,
    #[n(5)]
    #[serde(default)]
    pub advisor_id: Option<String>, // lecturer id
}

impl Student {
    pub fn is_advised_by(&self, lecturer: &Lecturer) -> bool {
        self.advisor_id.as_deref() == Some(lecturer.id.as_str())
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode,
)]
pub struct Lecturer {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub lecturer_number: String,
    #[n(3)]
    #[serde(default)]
    pub department: String,
}

/// Read access to student and lecturer profiles.
pub trait IdentityDirectory: Send + Sync {
    /// Student profile owned by the given user
    fn resolve_student(&self, user_id: &str) -> Result<Option<Student>, StoreError>;
    /// Lecturer profile owned by the given user
    fn resolve_lecturer(&self, user_id: &str) -> Result<Option<Lecturer>, StoreError>;
    fn student(&self, student_id: &str) -> Result<Option<Student>, StoreError>;
    /// Students whose advisor is the given lecturer
    fn advisees(&self, lecturer_id: &str) -> Result<Vec<Student>, StoreError>;
}

/// Bulk profile import, as read from a json file.
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryImport {
    #[serde(default)]
    pub lecturers: Vec<Lecturer>,
    #[serde(default)]
    pub students: Vec<Student>,
}

pub struct SledIdentityDirectory {
    students: sled::Tree,
    students_by_user: sled::Tree,
    lecturers: sled::Tree,
    lecturers_by_user: sled::Tree,
}

impl SledIdentityDirectory {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            students: db.open_tree("students")?,
            students_by_user: db.open_tree("students_by_user")?,
            lecturers: db.open_tree("lecturers")?,
            lecturers_by_user: db.open_tree("lecturers_by_user")?,
        })
    }

    pub fn put_student(&self, student: &Student) -> Result<(), StoreError> {
        let cbor = minicbor::to_vec(student).map_err(StoreError::encode)?;
        (&self.students, &self.students_by_user).transaction(|(students, by_user)| {
            students.insert(student.id.as_bytes(), cbor.as_slice())?;
            by_user.insert(student.user_id.as_bytes(), student.id.as_bytes())?;
            Ok::<_, sled::transaction::ConflictableTransactionError<StoreError>>(())
        })?;
        Ok(())
    }

    pub fn put_lecturer(&self, lecturer: &Lecturer) -> Result<(), StoreError> {
        let cbor = minicbor::to_vec(lecturer).map_err(StoreError::encode)?;
        (&self.lecturers, &self.lecturers_by_user).transaction(|(lecturers, by_user)| {
            lecturers.insert(lecturer.id.as_bytes(), cbor.as_slice())?;
            by_user.insert(lecturer.user_id.as_bytes(), lecturer.id.as_bytes())?;
            Ok::<_, sled::transaction::ConflictableTransactionError<StoreError>>(())
        })?;
        Ok(())
    }

    /// Loads lecturers before students so advisor links point at stored rows.
    pub fn import(&self, import: &DirectoryImport) -> Result<(usize, usize), StoreError> {
        for lecturer in &import.lecturers {
            self.put_lecturer(lecturer)?;
        }
        for student in &import.students {
            self.put_student(student)?;
        }
        Ok((import.lecturers.len(), import.students.len()))
    }

    fn lecturer(&self, lecturer_id: &[u8]) -> Result<Option<Lecturer>, StoreError> {
        match self.lecturers.get(lecturer_id)? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn student_by_key(&self, student_id: &[u8]) -> Result<Option<Student>, StoreError> {
        match self.students.get(student_id)? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl IdentityDirectory for SledIdentityDirectory {
    fn resolve_student(&self, user_id: &str) -> Result<Option<Student>, StoreError> {
        match self.students_by_user.get(user_id.as_bytes())? {
            Some(student_id) => self.student_by_key(&student_id),
            None => Ok(None),
        }
    }

    fn resolve_lecturer(&self, user_id: &str) -> Result<Option<Lecturer>, StoreError> {
        match self.lecturers_by_user.get(user_id.as_bytes())? {
            Some(lecturer_id) => self.lecturer(&lecturer_id),
            None => Ok(None),
        }
    }

    fn student(&self, student_id: &str) -> Result<Option<Student>, StoreError> {
        self.student_by_key(student_id.as_bytes())
    }

    fn advisees(&self, lecturer_id: &str) -> Result<Vec<Student>, StoreError> {
        let mut advisees = Vec::new();
        for entry in self.students.iter() {
            let (_, bytes) = entry?;
            let student: Student = minicbor::decode(&bytes)?;
            if student.advisor_id.as_deref() == Some(lecturer_id) {
                advisees.push(student);
            }
        }
        Ok(advisees)
    }
}
