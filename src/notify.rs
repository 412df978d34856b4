//! Advisor notifications
use super::identity::Student;
use super::reference::AchievementReference;

/// Told when a student submits an achievement for verification.
/// Delivery is best effort; a failure never undoes the submission.
pub trait AdvisorNotifier: Send + Sync {
    fn achievement_submitted(&self, student: &Student, reference: &AchievementReference) -> anyhow::Result<()>;
}

/// Writes the notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl AdvisorNotifier for LogNotifier {
    fn achievement_submitted(&self, student: &Student, reference: &AchievementReference) -> anyhow::Result<()> {
        tracing::info!(
            student = %student.student_number,
            advisor = student.advisor_id.as_deref().unwrap_or("none"),
            content_id = %reference.content_id,
            "achievement submitted for verification"
        );
        Ok(())
    }
}
