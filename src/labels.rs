//! Typed access to the label CSVs: the face table produced by the
//! download stage, the accepted-mask table written during labeling,
//! and the append-only writer both output stages share.
//!
//! Rows are kept raw until a caller asks for a key, so one malformed
//! line only poisons its own sample instead of the whole table.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use thiserror::Error;

use maskset_imaging::{BBox, MaskPolygon, MaskRegion};

/// Header of the face-label table coming out of the download stage.
pub const FACE_HEADER: &str = "key,label,height,width,xmin,xmax,ymin,ymax";

/// Header of the accepted-mask table in its simple rectangular form.
pub const RECT_HEADER: &str = "key,label,xmin,ymin,xmax,ymax";

/// Header of the accepted-mask table in its 8-point polygon form.
pub const POLYGON_HEADER: &str = "img,img_height,img_width,\
face_xtl,face_ytl,face_xbr,face_ybr,\
mask_xtl,mask_ytl,mask_xtm,mask_ytm,mask_xtr,mask_ytr,\
mask_xbr,mask_ybr,mask_xbm,mask_ybm,mask_xbl,mask_ybl";

/// Header of the final per-mask dataset table.
pub const DATASET_HEADER: &str = "image_id,mask_num,xmin,ymin,xmax,ymax";

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("line {line}: malformed row: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("no label rows for key {0:?}")]
    MissingLabel(String),

    #[error("unrecognized label header: {0:?}")]
    UnknownHeader(String),
}

/// One detected face on a source photo, in source pixel space.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    pub key: String,
    pub label: String,
    pub height: u32,
    pub width: u32,
    pub bbox: BBox,
}

/// One accepted mask on a photo, whichever shape it was annotated in.
#[derive(Debug, Clone)]
pub struct MaskRecord {
    pub key: String,
    pub region: MaskRegion,
}

/// One row appended for an accepted placement. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    pub key: String,
    pub bbox: BBox,
}

impl LabelRow {
    fn to_csv(&self) -> String {
        format!(
            "{},mask,{},{},{},{}",
            self.key, self.bbox.xmin, self.bbox.ymin, self.bbox.xmax, self.bbox.ymax
        )
    }
}

fn parse_u32(field: &str, line: usize) -> Result<u32, LabelError> {
    field
        .trim()
        .parse()
        .map_err(|_| LabelError::MalformedRow {
            line,
            reason: format!("expected integer, got {field:?}"),
        })
}

fn expect_fields(fields: &[&str], want: usize, line: usize) -> Result<(), LabelError> {
    if fields.len() != want {
        return Err(LabelError::MalformedRow {
            line,
            reason: format!("expected {want} fields, got {}", fields.len()),
        });
    }
    Ok(())
}

impl FaceRecord {
    fn parse(raw: &str, line: usize) -> Result<Self, LabelError> {
        let fields: Vec<&str> = raw.split(',').collect();
        expect_fields(&fields, 8, line)?;
        Ok(Self {
            key: fields[0].to_string(),
            label: fields[1].to_string(),
            height: parse_u32(fields[2], line)?,
            width: parse_u32(fields[3], line)?,
            bbox: BBox {
                xmin: parse_u32(fields[4], line)?,
                xmax: parse_u32(fields[5], line)?,
                ymin: parse_u32(fields[6], line)?,
                ymax: parse_u32(fields[7], line)?,
            },
        })
    }
}

impl MaskRecord {
    fn parse_rect(raw: &str, line: usize) -> Result<Self, LabelError> {
        let fields: Vec<&str> = raw.split(',').collect();
        expect_fields(&fields, 6, line)?;
        Ok(Self {
            key: fields[0].to_string(),
            region: MaskRegion::Rect(BBox {
                xmin: parse_u32(fields[2], line)?,
                ymin: parse_u32(fields[3], line)?,
                xmax: parse_u32(fields[4], line)?,
                ymax: parse_u32(fields[5], line)?,
            }),
        })
    }

    fn parse_polygon(raw: &str, line: usize) -> Result<Self, LabelError> {
        let fields: Vec<&str> = raw.split(',').collect();
        expect_fields(&fields, 19, line)?;
        // Fields 1..7 (image size and face box) are carried by the row
        // but not needed downstream; the resize stage measures the
        // photo itself and only cares about the mask outline.
        Ok(Self {
            key: fields[0].to_string(),
            region: MaskRegion::Polygon(MaskPolygon {
                xtl: parse_u32(fields[7], line)?,
                ytl: parse_u32(fields[8], line)?,
                xtm: parse_u32(fields[9], line)?,
                ytm: parse_u32(fields[10], line)?,
                xtr: parse_u32(fields[11], line)?,
                ytr: parse_u32(fields[12], line)?,
                xbr: parse_u32(fields[13], line)?,
                ybr: parse_u32(fields[14], line)?,
                xbm: parse_u32(fields[15], line)?,
                ybm: parse_u32(fields[16], line)?,
                xbl: parse_u32(fields[17], line)?,
                ybl: parse_u32(fields[18], line)?,
            }),
        })
    }
}

/// A parsed label CSV: header plus raw rows grouped by their first
/// field. Rows keep file order within a key.
#[derive(Debug)]
pub struct LabelTable {
    header: String,
    rows: HashMap<String, Vec<(usize, String)>>,
}

impl LabelTable {
    /// Read and group a label CSV. Fails only structurally (missing or
    /// unreadable file, empty file); row contents are validated later,
    /// per key.
    pub fn open(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading label table {}", path.display()))?;
        let mut lines = raw.lines().enumerate();
        let header = match lines.next() {
            Some((_, h)) => h.trim_end().to_string(),
            None => anyhow::bail!("label table {} is empty", path.display()),
        };

        let mut rows: HashMap<String, Vec<(usize, String)>> = HashMap::new();
        for (idx, line) in lines {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let key = match line.split(',').next() {
                Some(k) if !k.is_empty() => k.to_string(),
                _ => {
                    warn!("{}: line {}: row without a key, ignored", path.display(), idx + 1);
                    continue;
                }
            };
            rows.entry(key).or_default().push((idx + 1, line.to_string()));
        }
        Ok(Self { header, rows })
    }

    /// All keys present in the table, sorted for a stable batch order.
    pub fn unique_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.rows.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn raw_rows(&self, key: &str) -> Result<&[(usize, String)], LabelError> {
        match self.rows.get(key) {
            Some(rows) if !rows.is_empty() => Ok(rows),
            _ => Err(LabelError::MissingLabel(key.to_string())),
        }
    }

    /// Typed face rows for one key.
    pub fn face_rows(&self, key: &str) -> Result<Vec<FaceRecord>, LabelError> {
        if self.header != FACE_HEADER {
            return Err(LabelError::UnknownHeader(self.header.clone()));
        }
        self.raw_rows(key)?
            .iter()
            .map(|(line, raw)| FaceRecord::parse(raw, *line))
            .collect()
    }

    /// Typed mask rows for one key. The row shape is picked off the
    /// header, so callers never see rect vs polygon.
    pub fn mask_rows(&self, key: &str) -> Result<Vec<MaskRecord>, LabelError> {
        let parse: fn(&str, usize) -> Result<MaskRecord, LabelError> = if self.header == RECT_HEADER
        {
            MaskRecord::parse_rect
        } else if self.header == POLYGON_HEADER {
            MaskRecord::parse_polygon
        } else {
            return Err(LabelError::UnknownHeader(self.header.clone()));
        };
        self.raw_rows(key)?
            .iter()
            .map(|(line, raw)| parse(raw, *line))
            .collect()
    }
}

/// Append-only CSV writer, flushed per row so an interrupted run keeps
/// every completed line.
#[derive(Debug)]
pub struct LabelWriter {
    file: File,
    path: PathBuf,
}

impl LabelWriter {
    /// Open for appending, writing `header` only when the file is new
    /// or empty. Resuming mid-file never duplicates the header.
    pub fn open_append(path: &Path, header: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening label store {}", path.display()))?;
        let mut writer = Self {
            file,
            path: path.to_path_buf(),
        };
        if writer.file.metadata()?.len() == 0 {
            writer.write_line(header)?;
        }
        Ok(writer)
    }

    /// Truncate the store and start from zero with a fresh header.
    pub fn reinit(path: &Path, header: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("truncating {}", path.display()))?;
        let mut writer = Self {
            file,
            path: path.to_path_buf(),
        };
        writer.write_line(header)?;
        Ok(writer)
    }

    /// Append one accepted-placement row.
    pub fn append(&mut self, row: &LabelRow) -> Result<()> {
        self.write_line(&row.to_csv())
    }

    /// Append one preformatted CSV line.
    pub fn append_line(&mut self, line: &str) -> Result<()> {
        self.write_line(line)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.file, "{line}")
            .and_then(|_| self.file.flush())
            .with_context(|| format!("appending to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("maskset-labels-{}-{name}", std::process::id()))
    }

    fn write_table(name: &str, contents: &str) -> PathBuf {
        let path = temp_path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn face_rows_parse_typed_fields() {
        let path = write_table(
            "faces.csv",
            "key,label,height,width,xmin,xmax,ymin,ymax\n\
             a.jpg,human face,600,1200,100,300,50,250\n\
             b.jpg,human face,480,640,10,20,30,40\n\
             a.jpg,human face,600,1200,400,500,60,200\n",
        );
        let table = LabelTable::open(&path).unwrap();
        assert_eq!(table.unique_keys(), vec!["a.jpg", "b.jpg"]);

        let rows = table.face_rows("a.jpg").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bbox, BBox::new(100, 300, 50, 250));
        assert_eq!(rows[1].bbox.xmin, 400);
        assert_eq!(rows[0].height, 600);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn non_integer_field_is_malformed() {
        let path = write_table(
            "bad.csv",
            "key,label,height,width,xmin,xmax,ymin,ymax\n\
             a.jpg,human face,600,1200,100,oops,50,250\n",
        );
        let table = LabelTable::open(&path).unwrap();
        let err = table.face_rows("a.jpg").unwrap_err();
        assert!(matches!(err, LabelError::MalformedRow { line: 2, .. }));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn unknown_key_is_missing_label() {
        let path = write_table(
            "sparse.csv",
            "key,label,xmin,ymin,xmax,ymax\na.jpg,mask,1,2,3,4\n",
        );
        let table = LabelTable::open(&path).unwrap();
        assert!(matches!(
            table.mask_rows("zzz.jpg"),
            Err(LabelError::MissingLabel(_))
        ));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn rect_mask_rows_parse() {
        let path = write_table(
            "rect.csv",
            "key,label,xmin,ymin,xmax,ymax\na.jpg,mask,100,150,300,250\n",
        );
        let table = LabelTable::open(&path).unwrap();
        let rows = table.mask_rows("a.jpg").unwrap();
        assert_eq!(rows[0].region.tight_bbox(), BBox::new(100, 300, 150, 250));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn polygon_mask_rows_parse_and_tighten() {
        let path = write_table(
            "poly.csv",
            &format!(
                "{POLYGON_HEADER}\n\
                 a.jpg,600,1200,0,0,10,10,10,20,15,18,88,22,90,82,14,85,12,80\n"
            ),
        );
        let table = LabelTable::open(&path).unwrap();
        let rows = table.mask_rows("a.jpg").unwrap();
        assert_eq!(rows[0].region.tight_bbox(), BBox::new(10, 90, 18, 85));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn wrong_header_is_rejected() {
        let path = write_table("odd.csv", "who,knows\na,b\n");
        let table = LabelTable::open(&path).unwrap();
        assert!(matches!(
            table.mask_rows("a"),
            Err(LabelError::UnknownHeader(_))
        ));
        assert!(matches!(
            table.face_rows("a"),
            Err(LabelError::UnknownHeader(_))
        ));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn writer_appends_without_duplicating_header() {
        let path = temp_path("writer.csv");
        let _ = fs::remove_file(&path);

        let row = LabelRow {
            key: "a.jpg".to_string(),
            bbox: BBox::new(100, 300, 150, 250),
        };
        {
            let mut w = LabelWriter::open_append(&path, RECT_HEADER).unwrap();
            w.append(&row).unwrap();
        }
        // Reopen as a resumed run would
        {
            let mut w = LabelWriter::open_append(&path, RECT_HEADER).unwrap();
            w.append(&row).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                RECT_HEADER,
                "a.jpg,mask,100,150,300,250",
                "a.jpg,mask,100,150,300,250",
            ]
        );
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn reinit_truncates_and_rewrites_header() {
        let path = temp_path("reinit.csv");
        fs::write(&path, "key,label,xmin,ymin,xmax,ymax\nold,mask,1,2,3,4\n").unwrap();

        let _ = LabelWriter::reinit(&path, RECT_HEADER).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{RECT_HEADER}\n"));
        fs::remove_file(path).unwrap();
    }
}
