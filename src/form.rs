/// One of the four hidden inputs of the portal login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Token,
    Ceid,
    Checkit,
    FormType,
}

impl FormField {
    /// The `name` attribute of the input, also the key in the login body.
    pub fn name(self) -> &'static str {
        match self {
            FormField::Token => "_token",
            FormField::Ceid => "_ceid",
            FormField::Checkit => "checkit",
            FormField::FormType => "form_type",
        }
    }
}

/// Values scraped from the login form during one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInformation {
    pub token: Option<String>,
    pub ceid: Option<String>,
    pub checkit: Option<String>,
    pub form_type: Option<String>,
}

impl FormInformation {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Stores a value unless the field already holds one.
    pub(crate) fn set(&mut self, field: FormField, value: String) {
        let slot = self.slot_mut(field);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.token.is_some() && self.ceid.is_some() && self.checkit.is_some() && self.form_type.is_some()
    }

    pub fn clear(&mut self) {
        *self = FormInformation::default();
    }

    /// Builds the `application/x-www-form-urlencoded` login body.
    ///
    /// Values are concatenated verbatim, without percent-encoding, the way the
    /// portal's own form posts them. Returns `None` until all four are present.
    pub fn to_urlencoded(&self) -> Option<String> {
        Some(format!(
            "{}={}&{}={}&{}={}&{}={}",
            FormField::Token.name(),
            self.token.as_deref()?,
            FormField::Ceid.name(),
            self.ceid.as_deref()?,
            FormField::Checkit.name(),
            self.checkit.as_deref()?,
            FormField::FormType.name(),
            self.form_type.as_deref()?,
        ))
    }

    fn slot(&self, field: FormField) -> &Option<String> {
        match field {
            FormField::Token => &self.token,
            FormField::Ceid => &self.ceid,
            FormField::Checkit => &self.checkit,
            FormField::FormType => &self.form_type,
        }
    }

    fn slot_mut(&mut self, field: FormField) -> &mut Option<String> {
        match field {
            FormField::Token => &mut self.token,
            FormField::Ceid => &mut self.ceid,
            FormField::Checkit => &mut self.checkit,
            FormField::FormType => &mut self.form_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoded_is_verbatim() {
        let mut form = FormInformation::default();
        assert_eq!(form.to_urlencoded(), None);

        form.set(FormField::Token, "a+b/c=".to_owned());
        form.set(FormField::Ceid, "1".to_owned());
        form.set(FormField::Checkit, "1".to_owned());
        assert!(!form.is_complete());
        assert_eq!(form.to_urlencoded(), None);

        form.set(FormField::FormType, "login".to_owned());
        assert!(form.is_complete());
        assert_eq!(
            form.to_urlencoded().as_deref(),
            Some("_token=a+b/c=&_ceid=1&checkit=1&form_type=login")
        );
    }

    #[test]
    fn test_set_keeps_first_value() {
        let mut form = FormInformation::default();
        form.set(FormField::Ceid, "first".to_owned());
        form.set(FormField::Ceid, "second".to_owned());

        assert_eq!(form.get(FormField::Ceid), Some("first"));

        form.clear();
        assert_eq!(form.get(FormField::Ceid), None);
    }
}
