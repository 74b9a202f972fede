//! ASCII PLY parsing
//!
//! Reads the textual PLY variant into a [`PlyDocument`]. Parsing runs in
//! strictly ordered stages, and every structural stage is a hard gate:
//!
//! 1. magic and format lines
//! 2. header declarations up to `end_header`
//! 3. exactly `element vertex N` vertex records
//! 4. exactly `element face M` face records
//! 5. per-vertex normal derivation when the header declares no normals
//!
//! Declared counts are authoritative. Any structural violation aborts the
//! whole parse, while an individual number that fails to parse is replaced
//! by zero and only counted in [`PlyDocument::numeric_fallbacks`].

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::error::{PlySection, Result, ViewerError};

/// First line of every PLY file
pub const PLY_MAGIC: &str = "ply";
/// The only supported format line
pub const PLY_ASCII_FORMAT: &str = "format ascii 1.0";
/// Header terminator
pub const END_HEADER: &str = "end_header";

/// Mid-gray, fully opaque
pub const DEFAULT_COLOR: [f32; 4] = [128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0];

/// How color tokens are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorEncoding {
    /// Integer channels in `0..=255`
    #[default]
    Byte,
    /// Channels already normalized to `0.0..=1.0`
    Float,
}

impl ColorEncoding {
    fn from_type_token(token: &str) -> Self {
        match token {
            "float" | "float32" | "double" | "float64" => ColorEncoding::Float,
            _ => ColorEncoding::Byte,
        }
    }

    fn normalize(self, value: f32) -> f32 {
        let value = match self {
            ColorEncoding::Byte => value / 255.0,
            ColorEncoding::Float => value,
        };
        value.clamp(0.0, 1.0)
    }
}

/// Declarations collected from the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlyHeader {
    pub vertex_count: usize,
    pub face_count: usize,
    pub has_normals: bool,
    pub has_colors: bool,
    pub has_tex_coords: bool,
    pub vertex_color_encoding: ColorEncoding,
    pub face_color_encoding: ColorEncoding,
}

/// A single vertex record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlyVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl Default for PlyVertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            color: DEFAULT_COLOR,
            tex_coord: [0.0; 2],
        }
    }
}

/// A polygon record with at least three vertex indices
#[derive(Debug, Clone, PartialEq)]
pub struct PlyFace {
    pub indices: Vec<u32>,
    pub color: [f32; 4],
}

impl PlyFace {
    /// Number of triangles this face produces under fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.indices.len().saturating_sub(2)
    }

    /// Fan triangles `(i0, ik, ik+1)` for k in `1..len-1`
    pub fn fan_triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let first = self.indices.first().copied().unwrap_or_default();
        self.indices
            .windows(2)
            .skip(1)
            .map(move |pair| [first, pair[0], pair[1]])
    }
}

/// Parsed contents of a PLY file
#[derive(Debug, Clone, Default)]
pub struct PlyDocument {
    pub header: PlyHeader,
    pub vertices: Vec<PlyVertex>,
    pub faces: Vec<PlyFace>,
    /// Tokens that failed numeric conversion and were read as zero
    pub numeric_fallbacks: usize,
}

impl PlyDocument {
    /// Total triangles after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(PlyFace::triangle_count).sum()
    }
}

/// Loads and parses a PLY file from disk
pub fn load_ply<P: AsRef<Path>>(path: P) -> Result<PlyDocument> {
    let file = File::open(path.as_ref())?;
    let document = parse_ply(BufReader::new(file))?;

    log::info!(
        "Loaded PLY file {} with {} vertices and {} faces",
        path.as_ref().display(),
        document.vertices.len(),
        document.faces.len()
    );
    Ok(document)
}

/// Parses PLY text held in memory
pub fn parse_ply_str(source: &str) -> Result<PlyDocument> {
    parse_ply(source.as_bytes())
}

/// Parses PLY text from any buffered reader
pub fn parse_ply<R: BufRead>(reader: R) -> Result<PlyDocument> {
    let mut lines = reader.lines();
    let mut numbers = NumericParser::default();

    check_preamble(&mut lines)?;
    let header = parse_header(&mut lines, &mut numbers)?;

    let mut vertices = Vec::with_capacity(header.vertex_count.min(1 << 20));
    for record in 0..header.vertex_count {
        let line = next_line(&mut lines)?.ok_or(ViewerError::TruncatedInput {
            section: PlySection::Vertices,
            expected: header.vertex_count,
            found: record,
        })?;
        vertices.push(parse_vertex(&line, record, &header, &mut numbers)?);
    }

    let mut faces = Vec::with_capacity(header.face_count.min(1 << 20));
    for record in 0..header.face_count {
        let line = next_line(&mut lines)?.ok_or(ViewerError::TruncatedInput {
            section: PlySection::Faces,
            expected: header.face_count,
            found: record,
        })?;
        faces.push(parse_face(&line, record, &header, &mut numbers)?);
    }

    if !header.has_normals {
        derive_vertex_normals(&mut vertices, &faces);
    }

    if numbers.fallbacks > 0 {
        log::debug!(
            "{} numeric tokens could not be parsed and were read as zero",
            numbers.fallbacks
        );
    }

    Ok(PlyDocument {
        header,
        vertices,
        faces,
        numeric_fallbacks: numbers.fallbacks,
    })
}

/// Recomputes per-vertex normals from face geometry.
///
/// Each face contributes the unit normal of its first three vertices to
/// every vertex it references; the sums are then normalized. Vertices that
/// receive no contribution get `+Z` so every normal stays unit length.
pub fn derive_vertex_normals(vertices: &mut [PlyVertex], faces: &[PlyFace]) {
    let mut sums = vec![Vector3::<f32>::zero(); vertices.len()];

    for face in faces {
        if face.indices.len() < 3 {
            continue;
        }

        let corner = |slot: usize| -> Option<Vector3<f32>> {
            vertices
                .get(face.indices[slot] as usize)
                .map(|v| Vector3::from(v.position))
        };
        let (Some(v0), Some(v1), Some(v2)) = (corner(0), corner(1), corner(2)) else {
            continue;
        };

        let cross = (v1 - v0).cross(v2 - v0);
        if cross.magnitude2() <= f32::EPSILON * f32::EPSILON {
            continue; // degenerate
        }
        let face_normal = cross.normalize();

        for &index in &face.indices {
            if let Some(sum) = sums.get_mut(index as usize) {
                *sum += face_normal;
            }
        }
    }

    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        let normal = if sum.magnitude2() > f32::EPSILON * f32::EPSILON {
            sum.normalize()
        } else {
            Vector3::unit_z()
        };
        vertex.normal = normal.into();
    }
}

fn next_line<R: BufRead>(lines: &mut Lines<R>) -> Result<Option<String>> {
    lines.next().transpose().map_err(ViewerError::from)
}

fn check_preamble<R: BufRead>(lines: &mut Lines<R>) -> Result<()> {
    match next_line(lines)? {
        Some(line) if line == PLY_MAGIC => {}
        Some(line) => {
            return Err(ViewerError::Format(format!(
                "expected magic line '{PLY_MAGIC}', found '{line}'"
            )))
        }
        None => return Err(ViewerError::Format("empty input".to_string())),
    }

    match next_line(lines)? {
        Some(line) if line == PLY_ASCII_FORMAT => Ok(()),
        Some(line) => Err(ViewerError::Format(format!(
            "only '{PLY_ASCII_FORMAT}' is supported, found '{line}'"
        ))),
        None => Err(ViewerError::Format("missing format line".to_string())),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ElementScope {
    None,
    Vertex,
    Face,
    Other,
}

fn parse_header<R: BufRead>(
    lines: &mut Lines<R>,
    numbers: &mut NumericParser,
) -> Result<PlyHeader> {
    let mut header = PlyHeader::default();
    let mut scope = ElementScope::None;
    let mut vertex_color_seen = false;
    let mut face_color_seen = false;
    let mut declarations = 0;

    loop {
        let Some(raw) = next_line(lines)? else {
            return Err(ViewerError::TruncatedInput {
                section: PlySection::Header,
                expected: declarations + 1,
                found: declarations,
            });
        };
        let line = raw.trim();
        if line == END_HEADER {
            break;
        }
        declarations += 1;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["element", "vertex", .., count] => {
                header.vertex_count = numbers.count(count);
                scope = ElementScope::Vertex;
            }
            ["element", "face", .., count] => {
                header.face_count = numbers.count(count);
                scope = ElementScope::Face;
            }
            ["element", ..] => scope = ElementScope::Other,
            ["property", type_token, .., name] => match *name {
                "nx" | "ny" | "nz" => header.has_normals = true,
                "red" | "green" | "blue" | "alpha" => {
                    header.has_colors = true;
                    let encoding = ColorEncoding::from_type_token(type_token);
                    if scope == ElementScope::Face && !face_color_seen {
                        header.face_color_encoding = encoding;
                        face_color_seen = true;
                    } else if scope != ElementScope::Face && !vertex_color_seen {
                        header.vertex_color_encoding = encoding;
                        vertex_color_seen = true;
                    }
                }
                "s" | "t" | "u" | "v" => header.has_tex_coords = true,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(header)
}

fn parse_vertex(
    line: &str,
    record: usize,
    header: &PlyHeader,
    numbers: &mut NumericParser,
) -> Result<PlyVertex> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ViewerError::MalformedRecord {
            section: PlySection::Vertices,
            record,
            reason: format!("expected at least 3 position values, found {}", tokens.len()),
        });
    }

    let mut vertex = PlyVertex {
        position: [
            numbers.float(tokens[0]),
            numbers.float(tokens[1]),
            numbers.float(tokens[2]),
        ],
        ..PlyVertex::default()
    };
    let mut next = 3;

    if tokens.len() >= next + 3 {
        vertex.normal = [
            numbers.float(tokens[next]),
            numbers.float(tokens[next + 1]),
            numbers.float(tokens[next + 2]),
        ];
        next += 3;
    }

    if tokens.len() >= next + 4 {
        let encoding = header.vertex_color_encoding;
        for channel in 0..4 {
            vertex.color[channel] = encoding.normalize(numbers.float(tokens[next + channel]));
        }
        next += 4;
    }

    if tokens.len() >= next + 2 {
        vertex.tex_coord = [numbers.float(tokens[next]), numbers.float(tokens[next + 1])];
    }

    Ok(vertex)
}

fn parse_face(
    line: &str,
    record: usize,
    header: &PlyHeader,
    numbers: &mut NumericParser,
) -> Result<PlyFace> {
    let malformed = |reason: String| ViewerError::MalformedRecord {
        section: PlySection::Faces,
        record,
        reason,
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(count_token) = tokens.first() else {
        return Err(malformed("empty face record".to_string()));
    };

    let declared = numbers.int(count_token);
    if declared < 3 {
        return Err(malformed(format!(
            "a face needs at least 3 vertices, declared {declared}"
        )));
    }
    let present = tokens.len() - 1;
    let Some(declared) = usize::try_from(declared).ok().filter(|&k| k <= present) else {
        return Err(malformed(format!(
            "declared {declared} indices but only {present} present"
        )));
    };

    let mut indices = Vec::with_capacity(declared);
    for token in &tokens[1..=declared] {
        let index = numbers.int(token);
        if index < 0 || index as usize >= header.vertex_count {
            return Err(malformed(format!(
                "vertex index {index} out of range for {} vertices",
                header.vertex_count
            )));
        }
        indices.push(index as u32);
    }

    let trailing = &tokens[1 + declared..];
    let mut color = DEFAULT_COLOR;
    if trailing.len() >= 3 {
        let encoding = header.face_color_encoding;
        for channel in 0..3 {
            color[channel] = encoding.normalize(numbers.float(trailing[channel]));
        }
        if let Some(alpha) = trailing.get(3) {
            color[3] = encoding.normalize(numbers.float(alpha));
        }
    }

    Ok(PlyFace { indices, color })
}

/// Permissive number conversion: failures become zero and are counted
#[derive(Default)]
struct NumericParser {
    fallbacks: usize,
}

impl NumericParser {
    fn float(&mut self, token: &str) -> f32 {
        token.parse().unwrap_or_else(|_| {
            self.fallbacks += 1;
            0.0
        })
    }

    fn int(&mut self, token: &str) -> i64 {
        token.parse().unwrap_or_else(|_| {
            self.fallbacks += 1;
            0
        })
    }

    fn count(&mut self, token: &str) -> usize {
        token.parse().unwrap_or_else(|_| {
            self.fallbacks += 1;
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RIGHT_TRIANGLE: &str = "ply
format ascii 1.0
element vertex 3
element face 1
end_header
0 0 0
1 0 0
0 1 0
3 0 1 2
";

    fn assert_unit(normal: [f32; 3]) {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        assert_relative_eq!(length, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_right_triangle_derives_z_normals() {
        let doc = parse_ply_str(RIGHT_TRIANGLE).unwrap();

        assert_eq!(doc.vertices.len(), 3);
        assert_eq!(doc.faces.len(), 1);
        assert_eq!(doc.triangle_count(), 1);
        for vertex in &doc.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
            assert_eq!(vertex.color, DEFAULT_COLOR);
            assert_eq!(vertex.tex_coord, [0.0, 0.0]);
        }
    }

    #[test]
    fn test_declared_normals_are_kept_verbatim() {
        let source = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
property float nx
property float ny
property float nz
element face 1
property list uchar int vertex_indices
end_header
0 0 0 0.3 0.4 2.0
1 0 0 -1 0 0
0 1 0 0 0 0
3 0 1 2
";
        let doc = parse_ply_str(source).unwrap();

        assert!(doc.header.has_normals);
        assert_eq!(doc.vertices[0].normal, [0.3, 0.4, 2.0]);
        assert_eq!(doc.vertices[1].normal, [-1.0, 0.0, 0.0]);
        assert_eq!(doc.vertices[2].normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_header_flags_from_property_names() {
        let source = "ply
format ascii 1.0
comment exported by a scanner
element vertex 0
property float x
property uchar red
property uchar alpha
property float s
property float t
property float confidence
element face 0
end_header
";
        let doc = parse_ply_str(source).unwrap();

        assert!(!doc.header.has_normals);
        assert!(doc.header.has_colors);
        assert!(doc.header.has_tex_coords);
        assert_eq!(doc.header.vertex_color_encoding, ColorEncoding::Byte);
        assert!(doc.vertices.is_empty());
        assert!(doc.faces.is_empty());
    }

    #[test]
    fn test_vertex_optional_blocks_are_positional() {
        let source = "ply
format ascii 1.0
element vertex 2
property float nx
property uchar red
element face 0
end_header
1 2 3 0 0 1 255 0 51 255 0.25 0.75
4 5 6 0 1 0 9
";
        let doc = parse_ply_str(source).unwrap();
        let full = doc.vertices[0];
        assert_eq!(full.position, [1.0, 2.0, 3.0]);
        assert_eq!(full.normal, [0.0, 0.0, 1.0]);
        assert_relative_eq!(full.color[0], 1.0);
        assert_relative_eq!(full.color[1], 0.0);
        assert_relative_eq!(full.color[2], 0.2, epsilon = 1e-6);
        assert_relative_eq!(full.color[3], 1.0);
        assert_eq!(full.tex_coord, [0.25, 0.75]);

        // One trailing token is neither a color nor a texture coordinate
        let short = doc.vertices[1];
        assert_eq!(short.color, DEFAULT_COLOR);
        assert_eq!(short.tex_coord, [0.0, 0.0]);
    }

    #[test]
    fn test_float_color_encoding_is_not_rescaled() {
        let source = "ply
format ascii 1.0
element vertex 1
property float red
element face 0
end_header
0 0 0 0 0 1 0.5 0.25 1 1
";
        let doc = parse_ply_str(source).unwrap();
        assert_eq!(doc.header.vertex_color_encoding, ColorEncoding::Float);
        assert_eq!(doc.vertices[0].color, [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_bad_numbers_become_zero() {
        let source = "ply
format ascii 1.0
element vertex 1
element face 0
end_header
1.5 oops 2.5
";
        let doc = parse_ply_str(source).unwrap();
        assert_eq!(doc.vertices[0].position, [1.5, 0.0, 2.5]);
        assert_eq!(doc.numeric_fallbacks, 1);
    }

    #[test]
    fn test_wrong_magic_fails_fast() {
        let err = parse_ply_str("solid cube\nformat ascii 1.0\n").unwrap_err();
        assert!(matches!(err, ViewerError::Format(_)));
    }

    #[test]
    fn test_binary_format_is_rejected() {
        let source = "ply\nformat binary_little_endian 1.0\nend_header\n";
        let err = parse_ply_str(source).unwrap_err();
        assert!(matches!(err, ViewerError::Format(_)));
    }

    #[test]
    fn test_empty_input_is_format_error() {
        assert!(matches!(
            parse_ply_str("").unwrap_err(),
            ViewerError::Format(_)
        ));
    }

    #[test]
    fn test_missing_end_header_is_truncation() {
        let source = "ply\nformat ascii 1.0\nelement vertex 0\n";
        let err = parse_ply_str(source).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::TruncatedInput {
                section: PlySection::Header,
                ..
            }
        ));
    }

    #[test]
    fn test_short_vertex_block_is_truncation() {
        let source = "ply
format ascii 1.0
element vertex 2
element face 0
end_header
0 0 0
";
        let err = parse_ply_str(source).unwrap_err();
        match err {
            ViewerError::TruncatedInput {
                section,
                expected,
                found,
            } => {
                assert_eq!(section, PlySection::Vertices);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_face_block_is_truncation() {
        let source = "ply
format ascii 1.0
element vertex 3
element face 2
end_header
0 0 0
1 0 0
0 1 0
3 0 1 2
";
        let err = parse_ply_str(source).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::TruncatedInput {
                section: PlySection::Faces,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_vertex_with_two_tokens_is_malformed() {
        let source = "ply
format ascii 1.0
element vertex 1
element face 0
end_header
1 2
";
        let err = parse_ply_str(source).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::MalformedRecord {
                section: PlySection::Vertices,
                record: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_face_rules() {
        let header = "ply
format ascii 1.0
element vertex 3
element face 1
end_header
0 0 0
1 0 0
0 1 0
";
        for face_line in [
            "2 0 1",
            "4 0 1 2",
            "3 0 1 7",
            "3 0 -1 2",
            "",
            "9223372036854775807 0 1 2",
        ] {
            let err = parse_ply_str(&format!("{header}{face_line}\n")).unwrap_err();
            assert!(
                matches!(
                    err,
                    ViewerError::MalformedRecord {
                        section: PlySection::Faces,
                        ..
                    }
                ),
                "face line {face_line:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_face_color_and_short_trailing_block() {
        let source = "ply
format ascii 1.0
element vertex 3
element face 3
end_header
0 0 0
1 0 0
0 1 0
3 0 1 2 255 0 0
3 0 1 2 0 255 0 128
3 0 1 2 10 20
";
        let doc = parse_ply_str(source).unwrap();
        assert_eq!(doc.faces[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert_relative_eq!(doc.faces[1].color[1], 1.0);
        assert_relative_eq!(doc.faces[1].color[3], 128.0 / 255.0);
        assert_eq!(doc.faces[2].color, DEFAULT_COLOR);
    }

    #[test]
    fn test_trailing_lines_are_ignored() {
        let source = format!("{RIGHT_TRIANGLE}3 2 1 0\nthis is junk\n");
        let doc = parse_ply_str(&source).unwrap();
        assert_eq!(doc.faces.len(), 1);
    }

    #[test]
    fn test_quad_fan_triangulation() {
        let face = PlyFace {
            indices: vec![4, 5, 6, 7, 8],
            color: DEFAULT_COLOR,
        };
        let triangles: Vec<[u32; 3]> = face.fan_triangles().collect();
        assert_eq!(triangles, vec![[4, 5, 6], [4, 6, 7], [4, 7, 8]]);
        assert_eq!(face.triangle_count(), 3);
    }

    #[test]
    fn test_planar_mesh_shares_face_normal() {
        // Two quads in the plane y = 2, wound so the normal points -Y
        let source = "ply
format ascii 1.0
element vertex 6
element face 2
end_header
0 2 0
1 2 0
2 2 0
0 2 1
1 2 1
2 2 1
4 0 1 4 3
4 1 2 5 4
";
        let doc = parse_ply_str(source).unwrap();
        for vertex in &doc.vertices {
            assert_unit(vertex.normal);
            assert_relative_eq!(vertex.normal[0], 0.0, epsilon = 1e-6);
            assert_relative_eq!(vertex.normal[1], -1.0, epsilon = 1e-6);
            assert_relative_eq!(vertex.normal[2], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_derived_normals_are_unit_length() {
        // Tetrahedron plus one vertex no face touches
        let source = "ply
format ascii 1.0
element vertex 5
element face 4
end_header
0 0 0
1 0 0
0 1 0
0 0 1
9 9 9
3 0 2 1
3 0 1 3
3 0 3 2
3 1 2 3
";
        let doc = parse_ply_str(source).unwrap();
        for vertex in &doc.vertices {
            assert_unit(vertex.normal);
        }
        assert_eq!(doc.vertices[4].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_degenerate_face_contributes_nothing() {
        let mut vertices = vec![
            PlyVertex {
                position: [0.0, 0.0, 0.0],
                ..PlyVertex::default()
            },
            PlyVertex {
                position: [1.0, 0.0, 0.0],
                ..PlyVertex::default()
            },
            PlyVertex {
                position: [2.0, 0.0, 0.0],
                ..PlyVertex::default()
            },
        ];
        let faces = vec![PlyFace {
            indices: vec![0, 1, 2],
            color: DEFAULT_COLOR,
        }];
        derive_vertex_normals(&mut vertices, &faces);
        for vertex in &vertices {
            assert!(vertex.normal.iter().all(|c| c.is_finite()));
            assert_unit(vertex.normal);
        }
    }
}
