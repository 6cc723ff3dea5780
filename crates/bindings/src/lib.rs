#![allow(clippy::type_complexity)]
#![allow(clippy::useless_conversion)]
#![allow(clippy::too_many_arguments)]

use ndarray::{Array2, Array3};
use numpy::{
    PyArray1, PyArray2, PyArrayDescrMethods, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArray3, PyUntypedArrayMethods, ToPyArray,
};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyList;

use rst_autoimage::amber::inpcrd::parse_inpcrd;
use rst_autoimage::amber::prmtop::{parse_prmtop, AmberTopology};
use rst_autoimage::{
    AutoImage, AutoImageConfig, Frame, FrameOutcome, ImagePosition, MolecularTopology,
    PeriodicBox, SetupOutcome, Topology, TriclinicMode,
};

// ============================================================================
// Helpers
// ============================================================================

fn array3_to_frames(
    arr: &ndarray::ArrayView3<f64>,
    boxes: &[PeriodicBox],
    masses: &[f64],
) -> PyResult<Vec<Frame>> {
    let n_frames = arr.shape()[0];
    let n_atoms = arr.shape()[1];
    let mut frames = Vec::with_capacity(n_frames);
    for i in 0..n_frames {
        let coords: Vec<[f64; 3]> = (0..n_atoms)
            .map(|j| [arr[[i, j, 0]], arr[[i, j, 1]], arr[[i, j, 2]]])
            .collect();
        let frame = Frame::new(coords, masses.to_vec(), boxes[i])
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        frames.push(frame);
    }
    Ok(frames)
}

fn frames_to_array3(frames: &[Frame]) -> Array3<f64> {
    let n_frames = frames.len();
    let n_atoms = frames.first().map_or(0, Frame::n_atoms);
    let mut result = Array3::<f64>::zeros((n_frames, n_atoms, 3));
    for (i, frame) in frames.iter().enumerate() {
        for (j, atom) in frame.coords().iter().enumerate() {
            result[[i, j, 0]] = atom[0];
            result[[i, j, 1]] = atom[1];
            result[[i, j, 2]] = atom[2];
        }
    }
    result
}

/// Per-frame boxes from an (n_frames, 3) array of lengths or an
/// (n_frames, 6) array of lengths and angles.
fn array2_to_boxes(arr: &ndarray::ArrayView2<f64>) -> PyResult<Vec<PeriodicBox>> {
    let n_cols = arr.shape()[1];
    (0..arr.shape()[0])
        .map(|i| match n_cols {
            3 => Ok(PeriodicBox::orthogonal([
                arr[[i, 0]],
                arr[[i, 1]],
                arr[[i, 2]],
            ])),
            6 => Ok(PeriodicBox::from_params([
                arr[[i, 0]],
                arr[[i, 1]],
                arr[[i, 2]],
                arr[[i, 3]],
                arr[[i, 4]],
                arr[[i, 5]],
            ])),
            n => Err(PyValueError::new_err(format!(
                "box_dimensions must have 3 or 6 columns, got {}",
                n
            ))),
        })
        .collect()
}

// ============================================================================
// AUTOIMAGE
// ============================================================================

/// Re-center every frame on an anchor and image all other molecules
/// around it.
///
/// Parameters
/// ----------
/// trajectory : ndarray, shape (n_frames, n_atoms, 3)
///     Coordinates in Angstrom, float32 or float64.
/// box_dimensions : ndarray, shape (n_frames, 3) or (n_frames, 6)
///     Box lengths, optionally followed by angles in degrees.
/// molecule_sizes : list of int
///     Atoms per molecule in topology order.
/// solvent_flags : list of bool, optional
///     Solvent flag per molecule. Defaults to no solvent.
/// masses : ndarray, shape (n_atoms,), optional
///     Atomic masses. Defaults to unit masses.
/// origin : bool
///     Center on the coordinate origin instead of the box center.
/// use_mass : bool
///     Use mass-weighted centers.
/// first_atom : bool
///     Image mobile molecules by their first atom instead of their center.
/// triclinic : str
///     "auto", "familiar" or "triclinic".
/// anchor, fixed, mobile : str, optional
///     1-based atom number masks, e.g. "1-20,35".
///
/// Returns
/// -------
/// tuple
///     (imaged, skipped_frames) where imaged has the input dtype and
///     skipped_frames lists 0-based indices of frames left untouched.
#[pyfunction]
#[pyo3(
    name = "autoimage",
    signature = (
        trajectory,
        box_dimensions,
        molecule_sizes,
        solvent_flags=None,
        masses=None,
        origin=false,
        use_mass=false,
        first_atom=false,
        triclinic="auto",
        anchor=None,
        fixed=None,
        mobile=None
    )
)]
fn autoimage_py<'py>(
    py: Python<'py>,
    trajectory: &Bound<'py, numpy::PyUntypedArray>,
    box_dimensions: &Bound<'py, numpy::PyUntypedArray>,
    molecule_sizes: Vec<usize>,
    solvent_flags: Option<Vec<bool>>,
    masses: Option<PyReadonlyArray1<'py, f64>>,
    origin: bool,
    use_mass: bool,
    first_atom: bool,
    triclinic: &str,
    anchor: Option<String>,
    fixed: Option<String>,
    mobile: Option<String>,
) -> PyResult<(PyObject, Vec<usize>)> {
    let is_f32 = trajectory
        .dtype()
        .is_equiv_to(&numpy::dtype_bound::<f32>(py));

    let traj_f64: PyReadonlyArray3<'py, f64> = if is_f32 {
        let arr = trajectory.call_method1("astype", (numpy::dtype_bound::<f64>(py),))?;
        arr.extract()?
    } else {
        trajectory.extract()?
    };
    let box_f64: PyReadonlyArray2<'py, f64> = box_dimensions
        .call_method1("astype", (numpy::dtype_bound::<f64>(py),))?
        .extract()?;

    let traj_arr = traj_f64.as_array();
    let box_arr = box_f64.as_array();
    let n_frames = traj_arr.shape()[0];
    let n_atoms = traj_arr.shape()[1];
    if traj_arr.shape()[2] != 3 {
        return Err(PyValueError::new_err("trajectory must have shape (n_frames, n_atoms, 3)"));
    }
    if box_arr.shape()[0] != n_frames {
        return Err(PyValueError::new_err(format!(
            "box_dimensions has {} rows for {} frames",
            box_arr.shape()[0],
            n_frames
        )));
    }
    let boxes = array2_to_boxes(&box_arr)?;

    let masses: Vec<f64> = match masses {
        Some(m) => m.as_array().to_vec(),
        None => vec![1.0; n_atoms],
    };
    if masses.len() != n_atoms {
        return Err(PyValueError::new_err(format!(
            "{} masses for {} atoms",
            masses.len(),
            n_atoms
        )));
    }
    let solvent = solvent_flags.unwrap_or_else(|| vec![false; molecule_sizes.len()]);

    // The topology carries no box of its own, so the first frame decides.
    let box_type = boxes.first().map(PeriodicBox::box_type).unwrap_or_default();
    let topology =
        MolecularTopology::from_molecule_sizes(&molecule_sizes, &solvent, masses.clone(), box_type)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let mode: TriclinicMode = triclinic.parse().map_err(PyValueError::new_err)?;
    let mut config = AutoImageConfig::default()
        .with_origin(origin)
        .with_mass(use_mass)
        .with_triclinic(mode);
    if first_atom {
        config = config.with_position(ImagePosition::FirstAtom);
    }
    config.anchor = anchor;
    config.fixed = fixed;
    config.mobile = mobile;

    let mut action = AutoImage::new(config);
    let setup = action
        .setup(&topology)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let mut frames = array3_to_frames(&traj_arr, &boxes, &masses)?;
    let skipped: Vec<usize> = match setup {
        SetupOutcome::Ready => {
            let outcomes = action
                .process_frames(&mut frames)
                .map_err(|e| PyValueError::new_err(e.to_string()))?;
            outcomes
                .iter()
                .enumerate()
                .filter(|(_, o)| matches!(o, FrameOutcome::Skipped(_)))
                .map(|(i, _)| i)
                .collect()
        }
        SetupOutcome::Skip(reason) => {
            log::warn!("autoimage skipped all {} frames: {:?}", n_frames, reason);
            (0..n_frames).collect()
        }
    };

    let result_f64 = frames_to_array3(&frames).to_pyarray_bound(py);
    if is_f32 {
        let result_f32 = result_f64.call_method1("astype", (numpy::dtype_bound::<f32>(py),))?;
        Ok((result_f32.into(), skipped))
    } else {
        Ok((result_f64.into(), skipped))
    }
}

// ============================================================================
// AMBER PRMTOP
// ============================================================================

#[pyclass(name = "AmberTopology")]
struct PyAmberTopology {
    inner: AmberTopology,
}

#[pymethods]
impl PyAmberTopology {
    #[getter]
    fn n_atoms(&self) -> usize {
        self.inner.n_atoms
    }

    #[getter]
    fn n_residues(&self) -> usize {
        self.inner.n_residues
    }

    #[getter]
    fn atom_names<'py>(&self, py: Python<'py>) -> Bound<'py, PyList> {
        PyList::new_bound(py, &self.inner.atom_names)
    }

    #[getter]
    fn residue_labels<'py>(&self, py: Python<'py>) -> Bound<'py, PyList> {
        PyList::new_bound(py, &self.inner.residue_labels)
    }

    #[getter]
    fn molecule_sizes(&self) -> Vec<usize> {
        self.inner.molecule_sizes()
    }

    #[getter]
    fn solvent_flags(&self) -> Vec<bool> {
        self.inner.solvent_flags()
    }

    /// Box type declared by the topology: "none", "orthogonal",
    /// "triclinic" or "truncated_octahedron".
    #[getter]
    fn box_type(&self) -> &'static str {
        use rst_autoimage::BoxType;
        match self.inner.box_type() {
            BoxType::None => "none",
            BoxType::Orthogonal => "orthogonal",
            BoxType::Triclinic => "triclinic",
            BoxType::TruncatedOctahedron => "truncated_octahedron",
        }
    }

    #[getter]
    fn masses<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        PyArray1::from_vec_bound(py, self.inner.masses.clone())
    }

    fn atom_residue_indices<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<i64>> {
        let indices = self.inner.atom_residue_indices();
        let i64_indices: Vec<i64> = indices.iter().map(|&x| x as i64).collect();
        PyArray1::from_vec_bound(py, i64_indices)
    }
}

#[pyfunction]
#[pyo3(name = "read_prmtop")]
fn read_prmtop_py(path: &str) -> PyResult<PyAmberTopology> {
    let inner = parse_prmtop(path).map_err(|e| PyIOError::new_err(e.to_string()))?;
    Ok(PyAmberTopology { inner })
}

// ============================================================================
// AMBER INPCRD
// ============================================================================

/// Read an AMBER inpcrd/rst7 coordinate file.
///
/// Returns
/// -------
/// tuple
///     (positions, box) where positions has shape (n_atoms, 3) in Angstrom
///     and box is [a, b, c, alpha, beta, gamma], or None if not present.
#[pyfunction]
#[pyo3(name = "read_inpcrd")]
fn read_inpcrd_py<'py>(
    py: Python<'py>,
    path: &str,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Option<Vec<f64>>)> {
    let coords = parse_inpcrd(path).map_err(|e| PyIOError::new_err(e.to_string()))?;

    let n_atoms = coords.positions.len();
    let mut coord_array = Array2::<f64>::zeros((n_atoms, 3));
    for (i, &[x, y, z]) in coords.positions.iter().enumerate() {
        coord_array[[i, 0]] = x;
        coord_array[[i, 1]] = y;
        coord_array[[i, 2]] = z;
    }

    let box_params = coords.periodic_box.map(|b| {
        vec![
            b.lengths[0],
            b.lengths[1],
            b.lengths[2],
            b.angles[0],
            b.angles[1],
            b.angles[2],
        ]
    });

    Ok((coord_array.to_pyarray_bound(py), box_params))
}

#[pymodule]
fn rust_autoimage(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(autoimage_py, m)?)?;

    // AMBER
    m.add_class::<PyAmberTopology>()?;
    m.add_function(wrap_pyfunction!(read_prmtop_py, m)?)?;
    m.add_function(wrap_pyfunction!(read_inpcrd_py, m)?)?;

    Ok(())
}
