use model::notification::Notice;

pub struct Rendered {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Plain-text and HTML bodies for each notice kind.
pub fn render(notice: &Notice) -> Rendered {
    match notice {
        Notice::RequestApproved {
            employee_name,
            category_name,
            points,
            event_date,
        } => Rendered {
            subject: format!("Points request approved: {category_name}"),
            text: format!(
                "Hi {employee_name},\n\n\
                 Your request for {points} points in \"{category_name}\" \
                 (event date {event_date}) has been approved.\n"
            ),
            html: format!(
                "<p>Hi {employee_name},</p>\
                 <p>Your request for <strong>{points}</strong> points in \
                 <strong>{category_name}</strong> (event date {event_date}) \
                 has been <strong>approved</strong>.</p>"
            ),
        },
        Notice::RequestRejected {
            employee_name,
            category_name,
            points,
            reason,
        } => Rendered {
            subject: format!("Points request rejected: {category_name}"),
            text: format!(
                "The request for {points} points in \"{category_name}\" \
                 raised for {employee_name} was rejected.\n\nReason: {reason}\n"
            ),
            html: format!(
                "<p>The request for <strong>{points}</strong> points in \
                 <strong>{category_name}</strong> raised for {employee_name} \
                 was <strong>rejected</strong>.</p><p>Reason: {reason}</p>"
            ),
        },
        Notice::BonusAwarded {
            employee_name,
            bonus_points,
            quarter,
            milestones,
            notes,
        } => Rendered {
            subject: format!("Bonus points awarded for {quarter}"),
            text: format!(
                "Congratulations {employee_name}!\n\n\
                 You have been awarded {bonus_points} bonus points for \
                 reaching {milestones} in {quarter}.\n\n{notes}\n"
            ),
            html: format!(
                "<p>Congratulations {employee_name}!</p>\
                 <p>You have been awarded <strong>{bonus_points}</strong> \
                 bonus points for reaching <strong>{milestones}</strong> \
                 in {quarter}.</p><p>{notes}</p>"
            ),
        },
        Notice::BonusEligible {
            employee_name,
            quarter,
            potential_bonus,
        } => Rendered {
            subject: format!("You are eligible for a {quarter} bonus"),
            text: format!(
                "Hi {employee_name},\n\n\
                 You are eligible for up to {potential_bonus} bonus points \
                 in {quarter}.\n"
            ),
            html: format!(
                "<p>Hi {employee_name},</p>\
                 <p>You are eligible for up to \
                 <strong>{potential_bonus}</strong> bonus points in \
                 {quarter}.</p>"
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_renders_both_bodies() {
        let rendered = render(&Notice::RequestApproved {
            employee_name: "Asha".into(),
            category_name: "Mentoring".into(),
            points: 250,
            event_date: "01-05-2025".into(),
        });
        assert!(rendered.subject.contains("Mentoring"));
        assert!(rendered.text.contains("250"));
        assert!(rendered.html.contains("<strong>250</strong>"));
    }
}
