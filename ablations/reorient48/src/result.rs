//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    #[inline]
    fn u64_to_display(u: Option<u64>) -> String {
        match u {
            Some(u) => u.to_string(),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Volumes: {} ({} skipped)", p.get_volumes(), p.get_skipped())?;
    writeln!(w, "{S4}Operations: {}", p.get_ops())?;
    writeln!(w, "{S4}Invariant violations: {}", p.get_mismatched())?;
    writeln!(w, "{S4}Effective total time: {} us", p.get_op_time_us())?;
    writeln!(
        w,
        "{S4}Effective average time: {} us",
        f64_to_display(p.get_avg_op_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as u64);
    write!(w, "{S4}Most time-consuming operation costs {} us", u64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl FromIterator<(&'static str, Profile)> for AblationResult {
    fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }
}

impl AblationResult {
    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf).expect("Formatting error");
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }
    }
}
